//! Transport Adapters
//!
//! Implementations of [`crate::MailTransport`] that talk to real mail
//! infrastructure.

pub mod smtp;

pub use smtp::{SmtpConfig, SmtpSecurity, SmtpTransport};
