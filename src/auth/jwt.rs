/// JWT Token Codec
///
/// Stateless signer and verifier for access and refresh tokens.
/// Tokens are HS256-signed JWTs; the verifier pins HS256 and refuses any
/// other algorithm named in the header.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{TokenClaims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::TokenError;

const PINNED_ALGORITHM: Algorithm = Algorithm::HS256;

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    /// Access token lifetime in seconds
    pub access_expires_in: i64,
    pub refresh_token: String,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

/// Signs and verifies tokens with a process-lifetime secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        let mut validation = Validation::new(PINNED_ALGORITHM);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        // Expired means now > exp, with no grace period
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
        }
    }

    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }

    /// Lifetime configured for tokens of `kind`
    pub fn ttl_for(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a new access/refresh pair for a principal
    ///
    /// Each token gets its own `jti`, so two pairs issued for the same
    /// principal in the same second still differ.
    ///
    /// # Errors
    /// Returns `Signing` if encoding fails
    pub fn issue_pair(&self, principal_id: Uuid, email: &str) -> Result<TokenPair, TokenError> {
        let now = chrono::Utc::now().timestamp();

        let access_claims = self.claims_for(principal_id, email, TokenKind::Access, now);
        let refresh_claims = self.claims_for(principal_id, email, TokenKind::Refresh, now);

        Ok(TokenPair {
            access_token: self.sign(&access_claims)?,
            access_expires_in: self.access_ttl,
            refresh_token: self.sign(&refresh_claims)?,
            refresh_expires_in: self.refresh_ttl,
        })
    }

    fn claims_for(&self, principal_id: Uuid, email: &str, kind: TokenKind, now: i64) -> TokenClaims {
        TokenClaims::new(principal_id, email, kind, now, self.ttl_for(kind), &self.issuer)
    }

    /// Sign arbitrary claims with the pinned algorithm
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(PINNED_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm, issuer, and expiry; return the claims
    ///
    /// # Errors
    /// - `Malformed` if the token cannot be parsed
    /// - `UnexpectedAlgorithm` if the header names anything but HS256
    /// - `SignatureInvalid` if the signature does not match
    /// - `Expired` if `now > exp`
    /// - `InvalidIssuer` if `iss` is not the configured issuer
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = classify(e.kind());
                tracing::debug!(error = %e, "JWT verification failed");
                err
            })
    }

    /// Like [`verify`](Self::verify), additionally requiring `kind`
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
            TokenError::UnexpectedAlgorithm
        }
        ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
        _ => TokenError::Malformed,
    }
}
