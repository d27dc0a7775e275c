/// JWT Claims structure
///
/// Payload carried by both access and refresh tokens. Standard JWT claims
/// (RFC 7519) plus the principal's email and the token kind.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

/// Which half of a token pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived, stateless, presented on every gateway request
    Access,
    /// Long-lived, tracked in the session store, exchanged for a new pair
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (principal ID as UUID string)
    pub sub: String,
    pub email: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique per issuance
    pub jti: String,
    pub iss: String,
}

impl TokenClaims {
    /// Create claims for a new token issued at `now`
    ///
    /// # Arguments
    /// * `principal_id` - Principal's UUID
    /// * `email` - Principal's email address
    /// * `kind` - Access or refresh
    /// * `now` - Issue instant (Unix timestamp)
    /// * `ttl_seconds` - Lifetime from `now`
    /// * `issuer` - Issuer identifier
    pub fn new(
        principal_id: Uuid,
        email: &str,
        kind: TokenKind,
        now: i64,
        ttl_seconds: i64,
        issuer: &str,
    ) -> Self {
        Self {
            sub: principal_id.to_string(),
            email: email.to_string(),
            kind,
            iat: now,
            exp: now + ttl_seconds,
            jti: Uuid::new_v4().to_string(),
            iss: issuer.to_string(),
        }
    }

    /// Extract principal ID from claims
    ///
    /// # Errors
    /// Returns `Malformed` if the subject is not a valid UUID
    pub fn principal_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }

    /// Seconds left before expiry, relative to `now`; negative once expired
    pub fn remaining_seconds(&self, now: i64) -> i64 {
        self.exp - now
    }
}
