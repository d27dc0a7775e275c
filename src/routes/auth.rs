/// Authentication Routes
///
/// HTTP surface of the session manager: register, login, refresh, validate,
/// logout, and the current principal.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::validate_password_strength;
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedPrincipal;
use crate::session::SessionManager;
use crate::validators::{is_valid_email, is_valid_name};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of refresh and logout
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

/// POST /api/v1/auth/register
///
/// # Validation
/// - Email must be well formed
/// - Password must be 8+ chars with digit, lowercase, and uppercase
/// - Name must be non-empty with no suspicious content
///
/// # Errors
/// - 400: Validation errors
/// - 409: Email already registered
/// - 503: Storage unavailable
pub async fn register(
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("register");

    let email = is_valid_email(&form.email)?;
    let name = is_valid_name(&form.name)?;
    validate_password_strength(&form.password)?;

    let session = sessions.register(&email, &form.password, &name).await?;

    tracing::info!(
        request_id = %context.request_id,
        principal_id = %session.principal_id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(session))
}

/// POST /api/v1/auth/login
///
/// # Errors
/// - 400: Malformed email
/// - 401: Invalid credentials (unknown email and wrong password look the same)
/// - 503: Storage unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");

    let email = is_valid_email(&form.email)?;
    let session = sessions.login(&email, &form.password).await?;

    tracing::info!(
        request_id = %context.request_id,
        principal_id = %session.principal_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(session))
}

/// POST /api/v1/auth/refresh
///
/// Rotates the refresh token: the presented token stops working once a new
/// pair is returned.
///
/// # Errors
/// - 401: Revoked, invalid, superseded, or unknown-session refresh token
/// - 503: Storage unavailable
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");
    let pair = sessions.refresh(&form.refresh_token).await?;

    tracing::info!(request_id = %context.request_id, "Token refreshed successfully");

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /api/v1/auth/validate
///
/// Always 200; the body says whether the token is a live access token.
pub async fn validate(
    form: web::Json<ValidateRequest>,
    sessions: web::Data<SessionManager>,
) -> HttpResponse {
    HttpResponse::Ok().json(sessions.validate_access_token(&form.token))
}

/// POST /api/v1/auth/logout
///
/// **Requires a valid access token.** The body names the refresh token to
/// revoke. An already-invalid refresh token yields `{"success": false}`.
pub async fn logout(
    principal: web::ReqData<AuthenticatedPrincipal>,
    form: web::Json<RefreshRequest>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("logout").with_principal_id(principal.principal_id.to_string());
    let outcome = sessions.logout(&form.refresh_token).await?;

    tracing::info!(
        request_id = %context.request_id,
        principal_id = ?context.principal_id,
        success = outcome.success,
        "Logout processed"
    );

    Ok(HttpResponse::Ok().json(outcome))
}

/// GET /api/v1/auth/me
///
/// **Requires a valid access token.** Echoes the identity the gateway
/// extracted from it.
pub async fn get_current_principal(principal: web::ReqData<AuthenticatedPrincipal>) -> HttpResponse {
    HttpResponse::Ok().json(principal.into_inner())
}
