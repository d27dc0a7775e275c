/// Error Handling Module
///
/// Unified error handling for the session service.
/// It covers:
/// 1. Domain-specific error types (validation, storage, tokens, sessions)
/// 2. The unified `AppError` used for control flow
/// 3. HTTP response mapping with structured logging
/// 4. Error context enrichment

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for gateway input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    ControlCharacters(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::ControlCharacters(field) => {
                write!(f, "{} contains control characters", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Failures of the credential store or the session store.
///
/// Every variant surfaces to callers as "storage unavailable"; the detail
/// is kept for logs only.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// The call did not complete within the configured deadline
    Timeout(String),
    /// The backing service could not be reached
    Unavailable(String),
    /// A uniqueness constraint rejected the write
    UniqueViolation(String),
    Unexpected(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Timeout(op) => write!(f, "Storage call timed out: {}", op),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            StorageError::UniqueViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            StorageError::Unexpected(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl StdError for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StorageError::UniqueViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut => StorageError::Timeout("database pool acquire".to_string()),
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::Tls(_) => {
                StorageError::Unavailable(err.to_string())
            }
            _ => StorageError::Unexpected(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StorageError::Timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StorageError::Unavailable(err.to_string())
        } else {
            StorageError::Unexpected(err.to_string())
        }
    }
}

/// Token codec failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token could not be parsed into header, claims, and signature
    Malformed,
    SignatureInvalid,
    Expired,
    /// The header names an algorithm other than the pinned one
    UnexpectedAlgorithm,
    InvalidIssuer,
    /// A well-formed token of the other kind
    WrongKind,
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Token is malformed"),
            TokenError::SignatureInvalid => write!(f, "Token signature is invalid"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::UnexpectedAlgorithm => write!(f, "Token uses an unexpected signing algorithm"),
            TokenError::InvalidIssuer => write!(f, "Token issuer is not accepted"),
            TokenError::WrongKind => write!(f, "Token is of the wrong kind"),
            TokenError::Signing(msg) => write!(f, "Token signing failed: {}", msg),
        }
    }
}

impl StdError for TokenError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Authentication and session errors
///
/// `InvalidCredentials` covers both an unknown email and a wrong password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    AlreadyExists,
    InvalidCredentials,
    InvalidToken,
    Blacklisted,
    SessionNotFound,
    SessionMismatch,
    MissingToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::AlreadyExists => write!(f, "User with this email already exists"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::Blacklisted => write!(f, "Refresh token has been revoked"),
            AuthError::SessionNotFound => write!(f, "Session not found"),
            AuthError::SessionMismatch => write!(f, "Refresh token does not match the active session"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Storage(StorageError),
    Auth(AuthError),
    Config(ConfigError),
    Internal(String),
}

impl AppError {
    /// True when the failure was caused by a store dependency
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }

    /// Returns the session-level failure, if this is one
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            AppError::Auth(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Storage(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => AppError::Internal(format!("Token generation failed: {}", msg)),
            _ => AppError::Auth(AuthError::InvalidToken),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                e.to_string(),
            ),

            AppError::Storage(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
                "Storage service temporarily unavailable".to_string(),
            ),

            AppError::Auth(e) => {
                let code = match e {
                    AuthError::AlreadyExists => "ALREADY_EXISTS",
                    AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                    AuthError::InvalidToken => "TOKEN_INVALID",
                    AuthError::Blacklisted => "TOKEN_REVOKED",
                    AuthError::SessionNotFound => "SESSION_NOT_FOUND",
                    AuthError::SessionMismatch => "SESSION_MISMATCH",
                    AuthError::MissingToken => "MISSING_TOKEN",
                };
                (self.status_code(), code, e.to_string())
            }

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Storage(e) => {
                tracing::error!(request_id = request_id, error = %e, "Storage error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(e @ (AuthError::Blacklisted | AuthError::SessionMismatch)) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Rejected refresh token reuse"
                );
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(AuthError::AlreadyExists) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-request context for log correlation
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub principal_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            principal_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_principal_id(mut self, principal_id: impl Into<String>) -> Self {
        self.principal_id = Some(principal_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email");
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_token_errors_collapse_to_invalid_token() {
        for err in [
            TokenError::Malformed,
            TokenError::SignatureInvalid,
            TokenError::Expired,
            TokenError::UnexpectedAlgorithm,
            TokenError::WrongKind,
        ] {
            let app_err: AppError = err.into();
            assert_eq!(app_err.auth_error(), Some(&AuthError::InvalidToken));
        }
    }

    #[test]
    fn test_signing_failure_is_internal() {
        let app_err: AppError = TokenError::Signing("boom".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Auth(AuthError::AlreadyExists).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Auth(AuthError::SessionMismatch).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Storage(StorageError::Timeout("GET".to_string())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Validation(ValidationError::InvalidFormat("email")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_credentials_error_response_hides_cause() {
        let (status, body) =
            <AppError as ErrorHandler>::error_response(&AppError::Auth(AuthError::InvalidCredentials), "req-1");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code, "INVALID_CREDENTIALS");
        assert_eq!(body.message, "Invalid credentials");
        assert_eq!(body.error_id, "req-1");
    }

    #[test]
    fn test_storage_error_response_hides_detail() {
        let err = AppError::Storage(StorageError::Unavailable("redis://10.0.0.1 refused".to_string()));
        let (_, body) = <AppError as ErrorHandler>::error_response(&err, "req-2");
        assert_eq!(body.code, "STORAGE_UNAVAILABLE");
        assert!(!body.message.contains("10.0.0.1"));
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("token_refresh");
        assert_eq!(ctx.operation, "token_refresh");
        assert!(ctx.principal_id.is_none());

        let ctx = ctx.with_principal_id("user-123");
        assert_eq!(ctx.principal_id.as_deref(), Some("user-123"));
    }
}
