/// Middleware module
///
/// Gateway authentication and per-request logging.

mod gateway_auth;
mod request_logger;

pub use gateway_auth::{bearer_token, AuthenticatedPrincipal, GatewayAuth};
pub use request_logger::RequestLogger;
