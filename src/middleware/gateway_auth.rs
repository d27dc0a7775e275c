/// Gateway Authentication Middleware
///
/// Extracts the bearer token from the Authorization header, asks the
/// session manager whether it is a live access token, and injects the
/// caller's identity into request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use serde::Serialize;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AuthError};
use crate::session::SessionManager;

/// Identity of the caller, available to handlers behind [`GatewayAuth`]
/// as `web::ReqData<AuthenticatedPrincipal>`
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedPrincipal {
    pub principal_id: Uuid,
    pub email: String,
    /// Seconds until the presented access token expires
    pub expires_in: i64,
}

/// Parse `Bearer <token>`; the scheme is case-insensitive
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Protects a scope: requests without a valid access token get 401
pub struct GatewayAuth {
    sessions: Arc<SessionManager>,
}

impl GatewayAuth {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GatewayAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = GatewayAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(GatewayAuthService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct GatewayAuthService<S> {
    service: Rc<S>,
    sessions: Arc<SessionManager>,
}

impl<S, B> Service<ServiceRequest> for GatewayAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let token = match token {
            Some(token) => token,
            None => {
                tracing::warn!(path = %req.path(), "Missing or malformed Authorization header");
                let err: Error = AppError::Auth(AuthError::MissingToken).into();
                return Box::pin(async move { Err(err) });
            }
        };

        let validation = self.sessions.validate_access_token(&token);
        let principal = match (validation.valid, validation.principal_id, validation.email) {
            (true, Some(principal_id), Some(email)) => AuthenticatedPrincipal {
                principal_id,
                email,
                expires_in: validation.expires_in.unwrap_or_default(),
            },
            _ => {
                tracing::warn!(path = %req.path(), "Access token rejected by gateway");
                let err: Error = AppError::Auth(AuthError::InvalidToken).into();
                return Box::pin(async move { Err(err) });
            }
        };

        tracing::debug!(principal_id = %principal.principal_id, "Access token accepted");
        req.extensions_mut().insert(principal);

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
