/// Session lifecycle
///
/// The session manager state machine and the shapes it returns.

mod keys;
mod manager;
mod types;

pub use manager::SessionManager;
pub use types::{IssuedSession, LogoutOutcome, RefreshedPair, TokenValidation};
