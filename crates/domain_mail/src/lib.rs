//! Mail Domain
//!
//! Everything about email that is not SQL: which folder an email lives in,
//! how trashing and restoring works, what a valid outgoing message looks
//! like, how drafts become messages and how newsletters move through their
//! lifecycle.
//!
//! # Trash model
//!
//! Deleting an email is a soft delete. The email moves to the `trash` folder
//! and the folder it came from is remembered, so a restore puts it back
//! exactly where it was. Only emails already in the trash can be deleted for
//! good. See [`trash`].
//!
//! # Outbound mail
//!
//! Sending goes through the [`MailTransport`] port. The SMTP adapter uses
//! lettre; a logging transport stands in during development and a recording
//! mock is available for tests (feature `mock`).

pub mod folder;
pub mod message;
pub mod draft;
pub mod trash;
pub mod newsletter;
pub mod transport;
pub mod adapters;
pub mod error;

pub use folder::Folder;
pub use message::{MailAddress, RecipientKind, OutgoingMessage, IncomingEmail, AttachmentMeta, HeaderField, snippet};
pub use draft::DraftInput;
pub use trash::{TrashDecision, plan_trash, restore_target, ensure_purgeable};
pub use newsletter::{NewsletterInput, NewsletterStatus, personalize, message_for_recipient};
pub use transport::{MailTransport, LoggingTransport};
#[cfg(any(test, feature = "mock"))]
pub use transport::mock::RecordingTransport;
pub use adapters::{SmtpConfig, SmtpSecurity, SmtpTransport};
pub use error::MailError;
