mod auth;
mod health_check;

pub use auth::{get_current_principal, login, logout, refresh, register, validate};
pub use health_check::health_check;
