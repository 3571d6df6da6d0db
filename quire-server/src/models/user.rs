//! Registration and login input

use super::validation::{bounded, ValidationError};

/// Column widths from the users table
const MAX_USERNAME_LEN: usize = 80;
const MAX_EMAIL_LEN: usize = 120;

/// Validated registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Validate raw form fields, reporting the first problem found.
    ///
    /// # Example
    /// ```
    /// use quire_server::models::NewUser;
    ///
    /// assert!(NewUser::new("alice", "alice@example.com", "pw").is_ok());
    /// assert!(NewUser::new("", "alice@example.com", "pw").is_err());
    /// ```
    pub fn new(username: &str, email: &str, password: &str) -> Result<Self, ValidationError> {
        let username = bounded("Username", username, MAX_USERNAME_LEN)?;
        let email = bounded("Email", email, MAX_EMAIL_LEN)?;
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "Email",
                reason: "must contain '@'",
            });
        }
        if password.is_empty() {
            return Err(ValidationError::Empty { field: "Password" });
        }

        Ok(Self {
            username,
            email,
            password: password.to_owned(),
        })
    }
}
