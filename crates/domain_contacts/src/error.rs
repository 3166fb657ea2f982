//! Contacts domain errors

use thiserror::Error;

/// Errors that can occur in the contacts domain
#[derive(Debug, Error)]
pub enum ContactError {
    /// Contact validation failed
    #[error("Contact validation failed: {0}")]
    ValidationFailed(String),

    /// Invalid tag data
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Unknown tag target
    #[error("Unknown tag target: {0}")]
    UnknownTarget(String),
}

impl ContactError {
    /// Creates a ValidationFailed error from validation errors
    pub fn validation_failed(errors: Vec<String>) -> Self {
        ContactError::ValidationFailed(errors.join("; "))
    }

    pub fn invalid_tag(message: impl Into<String>) -> Self {
        ContactError::InvalidTag(message.into())
    }
}
