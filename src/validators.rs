/// Shape checks on registration and login input
///
/// Only length and format are checked here. Values reach the credential
/// store as bound query parameters, never as SQL text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_EMAIL_LENGTH: usize = 3; // a@b
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified; the domain needs at least one dot
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).unwrap();
}

/// Validate an email address and return it trimmed and lowercased
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email"));
    }
    match trimmed.split_once('@') {
        Some((local, _)) if local.len() <= MAX_LOCAL_PART_LENGTH => {}
        _ => return Err(ValidationError::InvalidFormat("email")),
    }

    // Emails are unique per principal regardless of case
    Ok(trimmed.to_ascii_lowercase())
}

/// Validate a display name and return it trimmed
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name", MAX_NAME_LENGTH));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters("name"));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(is_valid_email("  A@X.com ").unwrap(), "a@x.com");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(is_valid_email(""), Err(ValidationError::EmptyField("email")));
        assert_eq!(is_valid_email("nope-at-all"), Err(ValidationError::InvalidFormat("email")));
        assert_eq!(is_valid_email("ab"), Err(ValidationError::TooShort("email", 3)));
    }

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_ordinary_addresses_are_accepted() {
        for email in [
            "castro@example.com",
            "lancaster@example.com",
            "wasp_fan@example.com",
            "john.sleeper@example.com",
            "concat.andrea@example.com",
            "sandor@example.com",
            "x--y@example.com",
        ] {
            assert_eq!(is_valid_email(email).as_deref(), Ok(email), "{} should be accepted", email);
        }
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert!(is_valid_email("user@localhost").is_err());
        assert!(is_valid_email("a b@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(is_valid_email(&too_long), Err(ValidationError::TooLong("email", 254)));

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert_eq!(is_valid_email(&long_local), Err(ValidationError::InvalidFormat("email")));

        let max_local = format!("{}@example.com", "a".repeat(64));
        assert!(is_valid_email(&max_local).is_ok());
    }

    #[test]
    fn test_valid_name() {
        assert_eq!(is_valid_name("  John Doe ").unwrap(), "John Doe");
        assert!(is_valid_name("Jean-Pierre").is_ok());
        assert!(is_valid_name("O'Brien").is_ok());
        assert!(is_valid_name("Castillo").is_ok());
        assert!(is_valid_name("Anderson Union").is_ok());
        assert!(is_valid_name("Zoë Łukasz").is_ok());
    }

    #[test]
    fn test_name_length_limits() {
        assert_eq!(is_valid_name("   "), Err(ValidationError::EmptyField("name")));
        assert!(is_valid_name(&"a".repeat(256)).is_ok());
        assert_eq!(
            is_valid_name(&"a".repeat(257)),
            Err(ValidationError::TooLong("name", 256))
        );
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(
            is_valid_name("Name\0with\0null"),
            Err(ValidationError::ControlCharacters("name"))
        );
        assert!(is_valid_name("tab\tname").is_err());
    }
}
