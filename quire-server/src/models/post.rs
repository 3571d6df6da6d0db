//! Post input validation

use super::validation::{bounded, ValidationError};

/// Maximum length for post titles
const MAX_TITLE_LEN: usize = 200;

/// Validated post submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
}

impl NewPost {
    /// Title is required; empty content is stored as NULL.
    pub fn new(title: &str, content: &str) -> Result<Self, ValidationError> {
        let title = bounded("Title", title, MAX_TITLE_LEN)?;
        let content = Some(content.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_owned);
        Ok(Self { title, content })
    }
}
