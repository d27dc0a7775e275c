/// Authentication module
///
/// Token signing/verification and password hashing.

mod claims;
mod jwt;
mod password;

pub use claims::{TokenClaims, TokenKind};
pub use jwt::{TokenCodec, TokenPair};
pub use password::{hash_password, validate_password_strength, verify_password};
