//! Shared primitives for all Rust crates in Discepto.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Discepto crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::InvalidFormat(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller lacks one or more permissions. Carries the missing permission
    /// names in their persisted form.
    #[error("Missing permissions to execute action")]
    PermissionDenied {
        /// Permission names the caller would need in addition to its own.
        missing: Vec<String>,
    },

    /// Requested resource does not exist in its scope.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint violation on email, role name or membership.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Input failed format validation.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Essay content length is outside the accepted range.
    #[error("content length {length} is outside the allowed range {min}..={max}")]
    BadContentLength {
        /// Measured length in characters.
        length: usize,
        /// Community minimum.
        min: usize,
        /// Global maximum.
        max: usize,
    },

    /// Essay carries more tags than allowed.
    #[error("too many tags: {count} (max {max})")]
    TooManyTags {
        /// Number of distinct tags submitted.
        count: usize,
        /// Maximum accepted.
        max: usize,
    },

    /// The request-scoped cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a permission error from any iterable of permission names.
    pub fn permission_denied<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PermissionDenied {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the missing permission names when this is a permission error.
    #[must_use]
    pub fn missing_permissions(&self) -> Option<&[String]> {
        match self {
            Self::PermissionDenied { missing } => Some(missing.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(matches!(result, Err(AppError::InvalidFormat(_))));
    }

    #[test]
    fn permission_denied_uses_stable_message() {
        let error = AppError::permission_denied(["manage_role"]);
        assert_eq!(error.to_string(), "Missing permissions to execute action");
        assert_eq!(
            error.missing_permissions(),
            Some(["manage_role".to_owned()].as_slice())
        );
    }

    #[test]
    fn other_errors_carry_no_missing_permissions() {
        assert!(AppError::Cancelled.missing_permissions().is_none());
    }
}
