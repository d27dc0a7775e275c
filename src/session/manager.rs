/// Session Manager
///
/// Issues, rotates, validates, and revokes token pairs. Each principal has
/// at most one live refresh token, recorded in the session store; issuing a
/// new pair overwrites it. A refresh token is accepted only while it is
/// still that recorded value and absent from the deny-list.
///
/// Reads and writes of the active entry are not transactional: two
/// concurrent refreshes with the same token can both pass the comparison,
/// and the later write wins.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::auth::{hash_password, verify_password, TokenClaims, TokenCodec, TokenKind};
use crate::error::{AppError, AuthError, StorageError};
use crate::session::keys::{active_refresh_key, revoked_key, token_digest};
use crate::session::types::{IssuedSession, LogoutOutcome, RefreshedPair, TokenValidation};
use crate::store::{CredentialStore, Principal, SessionStore};

const REVOKED_MARKER: &str = "1";

pub struct SessionManager {
    codec: TokenCodec,
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    password_hash_cost: u32,
}

impl SessionManager {
    pub fn new(
        codec: TokenCodec,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        password_hash_cost: u32,
    ) -> Self {
        Self {
            codec,
            credentials,
            sessions,
            password_hash_cost,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create a principal and start its first session
    ///
    /// # Errors
    /// - `AlreadyExists` if the email is taken
    /// - `StorageUnavailable` if either store fails
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<IssuedSession, AppError> {
        if self.credentials.exists(email).await? {
            tracing::info!("Registration rejected, email already taken");
            return Err(AuthError::AlreadyExists.into());
        }

        let password_hash = self.hash(password).await?;
        let principal = Principal::new(email, password_hash, display_name);

        match self.credentials.create(&principal).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration of the same email
            Err(StorageError::UniqueViolation(_)) => return Err(AuthError::AlreadyExists.into()),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(principal_id = %principal.id, "Principal registered");
        self.start_session(&principal).await
    }

    /// Authenticate with email and password and start a new session,
    /// replacing any session the principal already had
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown email or a wrong password alike
    /// - `StorageUnavailable` if either store fails
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let principal = match self.credentials.lookup(email).await? {
            Some(principal) => principal,
            None => return Err(AuthError::InvalidCredentials.into()),
        };

        if !self.check_password(password, &principal.password_hash).await? {
            tracing::debug!(principal_id = %principal.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        tracing::info!(principal_id = %principal.id, "Principal logged in");
        self.start_session(&principal).await
    }

    /// Exchange a refresh token for a new pair
    ///
    /// Checks run in this order:
    /// 1. `Blacklisted` if the token was revoked by logout
    /// 2. `InvalidToken` if it fails verification or is not a refresh token
    /// 3. `SessionNotFound` if the principal has no active session
    /// 4. `SessionMismatch` if the active session holds a different token
    ///
    /// The presented token is superseded, not deny-listed.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedPair, AppError> {
        if self.sessions.exists(&revoked_key(refresh_token)).await? {
            return Err(AuthError::Blacklisted.into());
        }

        let claims = self.verify_refresh(refresh_token)?;
        let principal_id = claims.principal_id()?;

        let stored = self
            .sessions
            .get(&active_refresh_key(principal_id))
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if stored != token_digest(refresh_token) {
            tracing::warn!(principal_id = %principal_id, "Superseded refresh token presented");
            return Err(AuthError::SessionMismatch.into());
        }

        let pair = self.codec.issue_pair(principal_id, &claims.email)?;
        self.store_active(principal_id, &pair.refresh_token).await?;

        tracing::info!(principal_id = %principal_id, "Refresh token rotated");
        Ok(pair.into())
    }

    /// Stateless access-token check for the gateway
    ///
    /// Never fails: any problem with the token yields `valid: false`.
    pub fn validate_access_token(&self, access_token: &str) -> TokenValidation {
        let claims = match self.codec.verify_kind(access_token, TokenKind::Access) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Access token rejected");
                return TokenValidation::invalid();
            }
        };

        match claims.principal_id() {
            Ok(principal_id) => {
                let expires_in = claims.remaining_seconds(chrono::Utc::now().timestamp()).max(0);
                TokenValidation::valid(principal_id, claims.email, expires_in)
            }
            Err(_) => TokenValidation::invalid(),
        }
    }

    /// End the session a refresh token belongs to
    ///
    /// The token must be the principal's current refresh token: one that
    /// fails verification, is already deny-listed, or has been superseded
    /// yields `success: false` and leaves the store untouched. Otherwise the
    /// token is deny-listed for the rest of its lifetime and the principal's
    /// active session is removed.
    ///
    /// # Errors
    /// `StorageUnavailable` if a store read or write fails
    pub async fn logout(&self, refresh_token: &str) -> Result<LogoutOutcome, AppError> {
        let rejected = Ok(LogoutOutcome { success: false });

        let claims = match self.verify_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(_) => return rejected,
        };
        let principal_id = match claims.principal_id() {
            Ok(id) => id,
            Err(_) => return rejected,
        };

        if self.sessions.exists(&revoked_key(refresh_token)).await? {
            tracing::debug!(principal_id = %principal_id, "Logout with revoked refresh token");
            return rejected;
        }

        let active_key = active_refresh_key(principal_id);
        match self.sessions.get(&active_key).await? {
            Some(stored) if stored == token_digest(refresh_token) => {}
            _ => {
                tracing::warn!(principal_id = %principal_id, "Logout with a refresh token that is not the active one");
                return rejected;
            }
        }

        let remaining = claims.remaining_seconds(chrono::Utc::now().timestamp());
        if remaining > 0 {
            self.sessions
                .set_ex(
                    &revoked_key(refresh_token),
                    REVOKED_MARKER,
                    Duration::from_secs(remaining as u64),
                )
                .await?;
        }

        self.sessions.delete(&active_key).await?;

        tracing::info!(principal_id = %principal_id, "Session revoked");
        Ok(LogoutOutcome { success: true })
    }

    async fn start_session(&self, principal: &Principal) -> Result<IssuedSession, AppError> {
        let pair = self.codec.issue_pair(principal.id, &principal.email)?;
        self.store_active(principal.id, &pair.refresh_token).await?;

        Ok(IssuedSession::new(
            principal.id,
            &principal.email,
            &principal.display_name,
            pair,
        ))
    }

    async fn store_active(&self, principal_id: Uuid, refresh_token: &str) -> Result<(), AppError> {
        let ttl = Duration::from_secs(self.codec.refresh_ttl().max(1) as u64);
        self.sessions
            .set_ex(&active_refresh_key(principal_id), &token_digest(refresh_token), ttl)
            .await?;
        Ok(())
    }

    fn verify_refresh(&self, refresh_token: &str) -> Result<TokenClaims, AppError> {
        self.codec
            .verify_kind(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AppError::from(e)
            })
    }

    // bcrypt is CPU-bound; keep it off the async workers
    async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_string();
        let cost = self.password_hash_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn check_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::JwtSettings;
    use crate::store::{InMemoryCredentialStore, InMemorySessionStore};

    struct Harness {
        manager: SessionManager,
        sessions: Arc<InMemorySessionStore>,
    }

    fn harness() -> Harness {
        let codec = TokenCodec::new(&JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        });
        let sessions = Arc::new(InMemorySessionStore::new());
        let manager = SessionManager::new(
            codec,
            Arc::new(InMemoryCredentialStore::new()),
            sessions.clone(),
            crate::configuration::BCRYPT_MIN_COST,
        );
        Harness { manager, sessions }
    }

    fn auth_err<T: std::fmt::Debug>(result: Result<T, AppError>) -> AuthError {
        match result {
            Err(AppError::Auth(e)) => e,
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_active_entry_stores_digest_not_token() {
        let h = harness();
        let session = h.manager.register("a@x.com", "pw", "A").await.unwrap();

        let stored = h
            .sessions
            .get(&active_refresh_key(session.principal_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, token_digest(&session.refresh_token));
        assert_ne!(stored, session.refresh_token);
    }

    #[tokio::test]
    async fn test_logout_deny_lists_token_and_clears_session() {
        let h = harness();
        let session = h.manager.register("a@x.com", "pw", "A").await.unwrap();

        let outcome = h.manager.logout(&session.refresh_token).await.unwrap();
        assert!(outcome.success);

        assert!(h.sessions.exists(&revoked_key(&session.refresh_token)).await.unwrap());
        assert!(h
            .sessions
            .get(&active_refresh_key(session.principal_id))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_refresh_after_deny_list_entry_lapses_finds_no_session() {
        let h = harness();
        let session = h.manager.register("a@x.com", "pw", "A").await.unwrap();
        h.manager.logout(&session.refresh_token).await.unwrap();

        // Simulate the deny-list entry expiring before the token does
        h.sessions.delete(&revoked_key(&session.refresh_token)).await.unwrap();

        assert_eq!(
            auth_err(h.manager.refresh(&session.refresh_token).await),
            AuthError::SessionNotFound
        );
    }

    #[tokio::test]
    async fn test_refresh_does_not_deny_list_superseded_token() {
        let h = harness();
        let session = h.manager.register("a@x.com", "pw", "A").await.unwrap();

        h.manager.refresh(&session.refresh_token).await.unwrap();

        assert!(!h.sessions.exists(&revoked_key(&session.refresh_token)).await.unwrap());
        assert_eq!(h.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_not_deny_listed_on_logout() {
        let h = harness();
        let principal_id = Uuid::new_v4();
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims::new(principal_id, "a@x.com", TokenKind::Refresh, now - 1_000, 10, "test");
        let token = h.manager.codec().sign(&claims).unwrap();

        let outcome = h.manager.logout(&token).await.unwrap();

        assert!(!outcome.success);
        assert!(h.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_storage_outage_surfaces_from_commands_but_not_validation() {
        let h = harness();
        let session = h.manager.register("a@x.com", "pw", "A").await.unwrap();

        h.sessions.set_unavailable(true);

        assert!(h.manager.refresh(&session.refresh_token).await.unwrap_err().is_storage_unavailable());
        assert!(h.manager.logout(&session.refresh_token).await.unwrap_err().is_storage_unavailable());
        assert!(h.manager.login("a@x.com", "pw").await.unwrap_err().is_storage_unavailable());
        assert!(h.manager.validate_access_token(&session.access_token).valid);
    }

    #[tokio::test]
    async fn test_active_entry_lives_for_the_refresh_lifetime() {
        let h = harness();
        let session = h.manager.register("a@x.com", "pw", "A").await.unwrap();

        let ttl = h.sessions.ttl(&active_refresh_key(session.principal_id)).unwrap();
        assert!(ttl <= Duration::from_secs(604800));
        assert!(ttl > Duration::from_secs(604790));
    }

    #[tokio::test]
    async fn test_deny_list_entry_lives_for_the_token_remaining_lifetime() {
        let h = harness();
        let principal_id = Uuid::new_v4();
        let now = chrono::Utc::now().timestamp();
        // Issued 1000s ago with a 3600s lifetime: 2600s left
        let claims = TokenClaims::new(principal_id, "a@x.com", TokenKind::Refresh, now - 1_000, 3_600, "test");
        let token = h.manager.codec().sign(&claims).unwrap();
        h.manager.store_active(principal_id, &token).await.unwrap();

        assert!(h.manager.logout(&token).await.unwrap().success);

        let ttl = h.sessions.ttl(&revoked_key(&token)).unwrap();
        assert!(ttl <= Duration::from_secs(2_600));
        assert!(ttl > Duration::from_secs(2_590));
    }

    #[tokio::test]
    async fn test_logout_with_superseded_token_keeps_current_session() {
        let h = harness();
        let session = h.manager.register("a@x.com", "pw", "A").await.unwrap();
        let rotated = h.manager.refresh(&session.refresh_token).await.unwrap();

        let outcome = h.manager.logout(&session.refresh_token).await.unwrap();

        assert!(!outcome.success);
        assert!(!h.sessions.exists(&revoked_key(&session.refresh_token)).await.unwrap());
        assert!(h.manager.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_repeated_logout_does_not_end_a_later_session() {
        let h = harness();
        let first = h.manager.register("a@x.com", "pw", "A").await.unwrap();
        assert!(h.manager.logout(&first.refresh_token).await.unwrap().success);

        let second = h.manager.login("a@x.com", "pw").await.unwrap();
        let outcome = h.manager.logout(&first.refresh_token).await.unwrap();

        assert!(!outcome.success);
        assert!(h.manager.refresh(&second.refresh_token).await.is_ok());
    }
}
