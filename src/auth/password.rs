/// Password Hashing and Verification
///
/// bcrypt hashing for stored credentials, plus the password policy the
/// gateway applies to new registrations.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password using bcrypt with the given work factor
///
/// # Errors
/// Returns `Internal` if bcrypt rejects the cost or fails to hash
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// A stored hash that bcrypt cannot parse is treated as a mismatch, so a
/// corrupt row reads as bad credentials rather than a distinguishable error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH));
    }

    // bcrypt only reads the first 72 bytes; the cap also bounds hashing work
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::InvalidFormat("password"));
    }

    Ok(())
}
