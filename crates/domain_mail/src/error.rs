//! Mail domain errors

use thiserror::Error;

/// Errors that can occur in the mail domain
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Unknown folder: {0}")]
    UnknownFolder(String),

    #[error("Unknown recipient kind: {0}")]
    UnknownRecipientKind(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The email is already in the trash
    #[error("Email is already in the trash")]
    AlreadyTrashed,

    /// Permanent deletion attempted outside the trash
    #[error("Only emails in the trash can be deleted permanently (email is in {0})")]
    NotInTrash(String),

    /// Folder moves cannot target the trash; use the trash operation
    #[error("Cannot move an email to {0} directly")]
    ForbiddenMove(String),

    #[error("Unknown newsletter status: {0}")]
    UnknownStatus(String),

    /// Newsletter lifecycle violation
    #[error("Invalid newsletter transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid newsletter: {0}")]
    InvalidNewsletter(String),

    /// The transport could not deliver the message
    #[error("Mail transport '{transport}' failed: {message}")]
    Transport {
        transport: String,
        message: String,
    },
}

impl MailError {
    pub fn invalid_message(message: impl Into<String>) -> Self {
        MailError::InvalidMessage(message.into())
    }

    pub fn transport(transport: impl Into<String>, message: impl Into<String>) -> Self {
        MailError::Transport {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// True when the operation clashes with the current state of a record
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            MailError::AlreadyTrashed | MailError::NotInTrash(_) | MailError::InvalidTransition(_)
        )
    }

    /// True when caller input was malformed
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MailError::UnknownFolder(_)
                | MailError::UnknownRecipientKind(_)
                | MailError::InvalidAddress(_)
                | MailError::InvalidMessage(_)
                | MailError::ForbiddenMove(_)
                | MailError::UnknownStatus(_)
                | MailError::InvalidNewsletter(_)
        )
    }
}
