//! Validation error types

use std::fmt;

/// Validation error for form input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format
    InvalidFormat { field: &'static str, reason: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} is required.", field),
            Self::TooLong { field, max } => {
                write!(f, "{} must be at most {} characters.", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{} {}.", field, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim, then check presence and length against the column width.
pub(crate) fn bounded(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }

    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }

    Ok(trimmed.to_owned())
}
