//! Sign-up form checks.

use thiserror::Error;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Why a registration form was rejected. The message is shown to the user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields!")]
    MissingFields,

    #[error("Username must be at least 3 characters!")]
    UsernameTooShort,

    #[error("Password confirmation does not match!")]
    PasswordMismatch,

    #[error("Weak password! Use at least 6 characters including both letters and digits.")]
    WeakPassword,
}

/// Check a registration form; the first failing rule wins.
///
/// Rules, in order: every field present, trimmed username at least
/// 3 characters, password equals confirmation, password at least
/// 6 characters with an ASCII letter and a digit.
pub fn validate_registration(
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    let username = username.trim();

    if username.is_empty() || password.is_empty() || confirm_password.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(ValidationError::UsernameTooShort);
    }

    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }

    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if password.chars().count() < MIN_PASSWORD_CHARS || !has_letter || !has_digit {
        return Err(ValidationError::WeakPassword);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_registration() {
        assert_eq!(validate_registration("alice", "abc123", "abc123"), Ok(()));
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            validate_registration("   ", "abc123", "abc123"),
            Err(ValidationError::MissingFields)
        );
        assert_eq!(
            validate_registration("alice", "abc123", ""),
            Err(ValidationError::MissingFields)
        );
    }

    #[test]
    fn test_short_username_counts_trimmed_chars() {
        assert_eq!(
            validate_registration("  al  ", "abc123", "abc123"),
            Err(ValidationError::UsernameTooShort)
        );
    }

    #[test]
    fn test_mismatch_checked_before_strength() {
        assert_eq!(
            validate_registration("alice", "abc", "abd"),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn test_weak_passwords() {
        for weak in ["abc12", "abcdef", "123456"] {
            assert_eq!(
                validate_registration("alice", weak, weak),
                Err(ValidationError::WeakPassword),
                "{weak}"
            );
        }
    }
}
