use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::TokenPair;

/// Result of a successful register or login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    pub principal_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_in: i64,
}

impl IssuedSession {
    pub(crate) fn new(principal_id: Uuid, email: &str, display_name: &str, pair: TokenPair) -> Self {
        Self {
            principal_id,
            email: email.to_string(),
            display_name: display_name.to_string(),
            access_token: pair.access_token,
            access_expires_in: pair.access_expires_in,
            refresh_token: pair.refresh_token,
            refresh_expires_in: pair.refresh_expires_in,
        }
    }
}

/// Result of a successful refresh rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshedPair {
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_in: i64,
}

impl From<TokenPair> for RefreshedPair {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            access_expires_in: pair.access_expires_in,
            refresh_token: pair.refresh_token,
            refresh_expires_in: pair.refresh_expires_in,
        }
    }
}

/// Answer to "is this access token good right now?"
///
/// Identity fields are present only when `valid` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Seconds until the access token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl TokenValidation {
    pub fn valid(principal_id: Uuid, email: String, expires_in: i64) -> Self {
        Self {
            valid: true,
            principal_id: Some(principal_id),
            email: Some(email),
            expires_in: Some(expires_in),
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: false,
            principal_id: None,
            email: None,
            expires_in: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutOutcome {
    pub success: bool,
}
