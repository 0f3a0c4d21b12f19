use std::fmt;

use crate::error::ValidationError;

/// A validated, non-blank prompt. Keeps the text exactly as the client sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn parse(raw: Option<String>) -> Result<Self, ValidationError> {
        let raw = raw.ok_or(ValidationError::MissingPrompt)?;
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Prompt {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Prompt::parse(Some(value.to_string()))
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
