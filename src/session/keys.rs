//! Session store key layout.
//!
//! `refresh:{principal_id}` holds the digest of the principal's one live
//! refresh token. `blacklist:{digest}` marks a refresh token revoked by
//! logout. Raw tokens never reach the store.

use sha2::{Digest, Sha256};
use uuid::Uuid;

const ACTIVE_REFRESH_PREFIX: &str = "refresh:";
const REVOKED_PREFIX: &str = "blacklist:";

/// SHA-256 hex digest of a token
pub(crate) fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub(crate) fn active_refresh_key(principal_id: Uuid) -> String {
    format!("{}{}", ACTIVE_REFRESH_PREFIX, principal_id)
}

pub(crate) fn revoked_key(token: &str) -> String {
    format!("{}{}", REVOKED_PREFIX, token_digest(token))
}
