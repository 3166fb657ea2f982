//! Drafts
//!
//! A draft is an unfinished outgoing message. Saving a draft only checks the
//! parts that are present; the full outgoing rules apply when it is sent.

use serde::{Deserialize, Serialize};

use core_kernel::EmailId;
use crate::error::MailError;
use crate::message::{MailAddress, OutgoingMessage, MAX_SUBJECT_LEN};

/// Editable fields of a draft
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInput {
    #[serde(default)]
    pub to: Vec<MailAddress>,
    #[serde(default)]
    pub cc: Vec<MailAddress>,
    #[serde(default)]
    pub bcc: Vec<MailAddress>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    /// The email this draft answers, if any
    #[serde(default)]
    pub in_reply_to_email_id: Option<EmailId>,
}

impl DraftInput {
    /// Validates and normalizes the addresses already entered
    pub fn normalized(self) -> Result<Self, MailError> {
        let normalize = |list: Vec<MailAddress>| -> Result<Vec<MailAddress>, MailError> {
            list.iter().map(MailAddress::validated).collect()
        };
        if self.subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(MailError::invalid_message("subject is too long"));
        }
        Ok(Self {
            to: normalize(self.to)?,
            cc: normalize(self.cc)?,
            bcc: normalize(self.bcc)?,
            subject: self.subject.trim().to_string(),
            body_text: self.body_text,
            body_html: self.body_html,
            in_reply_to_email_id: self.in_reply_to_email_id,
        })
    }

    /// Turns the draft into a message from `from`; the caller validates it
    pub fn into_outgoing(self, from: MailAddress, in_reply_to: Option<String>) -> OutgoingMessage {
        OutgoingMessage {
            from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            body_text: self.body_text,
            body_html: self.body_html,
            in_reply_to,
            message_id: None,
        }
    }
}
