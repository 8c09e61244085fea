//! User domain types and validation rules.

use std::fmt::{Display, Formatter};

use discepto_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(i32);

impl UserId {
    /// Wraps a persisted user id.
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Public user record. The password hash never leaves the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Canonical email address.
    pub email: String,
}

/// Profile visible to anyone: no email, plus the upvotes received on the
/// user's essays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Upvotes received across all essays.
    pub karma: i64,
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name.
    pub name: NonEmptyString,
    /// Canonical email address.
    pub email: EmailAddress,
}

impl Registration {
    /// Validates name, email and password strength together.
    pub fn new(name: &str, email: &str, password: &str) -> AppResult<Self> {
        let name = NonEmptyString::new(name.trim())?;
        let email = EmailAddress::new(email)?;
        validate_password(password)?;
        Ok(Self { name, email })
    }
}

/// Maximum length of an email address.
pub const EMAIL_MAX_LENGTH: usize = 254;

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// The local part accepts letters, digits and ``.!#$%&'*+/=?^_`{|}~-``.
    /// The domain is a dot separated list of labels of at most 63 letters,
    /// digits or hyphens, never starting or ending with a hyphen.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() || trimmed.len() > EMAIL_MAX_LENGTH {
            return Err(AppError::InvalidFormat(format!(
                "email address must contain 1 to {EMAIL_MAX_LENGTH} characters"
            )));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::InvalidFormat(
                "email address must contain '@'".to_owned(),
            ));
        };

        if local.is_empty() || !local.chars().all(is_local_part_char) {
            return Err(AppError::InvalidFormat(
                "email local part contains invalid characters".to_owned(),
            ));
        }

        if !domain.split('.').all(is_domain_label) {
            return Err(AppError::InvalidFormat(
                "email domain is malformed".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

fn is_local_part_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(character)
}

fn is_domain_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// Minimum password length.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Maximum password length.
pub const PASSWORD_MAX_LENGTH: usize = 64;

/// Validates a plaintext password.
///
/// - 8 to 64 printable characters.
/// - At least one letter, one digit and one other symbol.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();
    if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&char_count) {
        return Err(AppError::InvalidFormat(format!(
            "password must contain {PASSWORD_MIN_LENGTH} to {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    let mut has_letter = false;
    let mut has_digit = false;
    let mut has_symbol = false;
    for character in password.chars() {
        if character.is_control() {
            return Err(AppError::InvalidFormat(
                "password must not contain control characters".to_owned(),
            ));
        }

        if character.is_alphabetic() {
            has_letter = true;
        } else if character.is_numeric() {
            has_digit = true;
        } else {
            has_symbol = true;
        }
    }

    if !(has_letter && has_digit && has_symbol) {
        return Err(AppError::InvalidFormat(
            "password must contain a letter, a digit and a symbol".to_owned(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(EmailAddress::new("a@x.com").is_ok());
        assert!(EmailAddress::new("first.last+tag@mail.example.org").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for candidate in ["", "plain", "@x.com", "a@", "a@-x.com", "a@x..com", "a b@x.com"] {
            assert!(
                matches!(EmailAddress::new(candidate), Err(AppError::InvalidFormat(_))),
                "{candidate} should be rejected"
            );
        }
    }

    #[test]
    fn strong_password_passes() {
        assert!(validate_password("Strong1!pass").is_ok());
    }

    #[test]
    fn weak_passwords_are_rejected() {
        for candidate in ["short1!", "nodigits!!", "n0symbols1", "12345678!"] {
            assert!(validate_password(candidate).is_err(), "{candidate}");
        }
        assert!(validate_password(&"a1!".repeat(30)).is_err());
    }

    #[test]
    fn registration_requires_a_name() {
        let result = Registration::new(" ", "a@x.com", "Strong1!pass");
        assert!(matches!(result, Err(AppError::InvalidFormat(_))));
    }
}
