//! Newsletters
//!
//! ```text
//! draft ──schedule──▶ scheduled ──claim──▶ sending ──finish──▶ sent
//!   ▲                    │                   │
//!   ├────unschedule──────┘                   │
//!   └───────────────release──────────────────┘
//! draft ──────────claim──────────▶ sending
//! ```
//!
//! Only drafts can be edited. A newsletter is claimed before any copy goes
//! out, so only one sender ever holds it in `sending`. Sending and sent
//! newsletters cannot be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::TagId;
use crate::error::MailError;
use crate::message::{MailAddress, OutgoingMessage, MAX_SUBJECT_LEN};

/// Placeholder replaced by the recipient's name
pub const NAME_PLACEHOLDER: &str = "{{name}}";
const FALLBACK_NAME: &str = "friend";

/// Lifecycle state of a newsletter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsletterStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
}

impl NewsletterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsletterStatus::Draft => "draft",
            NewsletterStatus::Scheduled => "scheduled",
            NewsletterStatus::Sending => "sending",
            NewsletterStatus::Sent => "sent",
        }
    }

    pub fn ensure_editable(&self) -> Result<(), MailError> {
        match self {
            NewsletterStatus::Draft => Ok(()),
            other => Err(MailError::InvalidTransition(format!(
                "a {} newsletter cannot be edited",
                other
            ))),
        }
    }

    /// Schedules (or reschedules) delivery for `at`, which must be in the future
    pub fn schedule(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> Result<NewsletterStatus, MailError> {
        self.ensure_idle()?;
        if at <= now {
            return Err(MailError::InvalidNewsletter("scheduled time must be in the future".to_string()));
        }
        Ok(NewsletterStatus::Scheduled)
    }

    pub fn unschedule(&self) -> Result<NewsletterStatus, MailError> {
        match self {
            NewsletterStatus::Scheduled => Ok(NewsletterStatus::Draft),
            other => Err(MailError::InvalidTransition(format!(
                "a {} newsletter is not scheduled",
                other
            ))),
        }
    }

    /// Takes a draft or scheduled newsletter for delivery
    pub fn claim(&self) -> Result<NewsletterStatus, MailError> {
        self.ensure_idle()?;
        Ok(NewsletterStatus::Sending)
    }

    /// Completes a delivery run that got at least one copy out
    pub fn finish(&self) -> Result<NewsletterStatus, MailError> {
        match self {
            NewsletterStatus::Sending => Ok(NewsletterStatus::Sent),
            other => Err(MailError::InvalidTransition(format!(
                "a {} newsletter is not being sent",
                other
            ))),
        }
    }

    /// Hands back a claimed newsletter whose run delivered nothing
    pub fn release(&self) -> Result<NewsletterStatus, MailError> {
        match self {
            NewsletterStatus::Sending => Ok(NewsletterStatus::Draft),
            other => Err(MailError::InvalidTransition(format!(
                "a {} newsletter is not being sent",
                other
            ))),
        }
    }

    pub fn ensure_deletable(&self) -> Result<(), MailError> {
        match self {
            NewsletterStatus::Sending | NewsletterStatus::Sent => Err(MailError::InvalidTransition(format!(
                "a {} newsletter cannot be deleted",
                self
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_idle(&self) -> Result<(), MailError> {
        match self {
            NewsletterStatus::Sending => Err(MailError::InvalidTransition(
                "newsletter is already being sent".to_string(),
            )),
            NewsletterStatus::Sent => Err(MailError::InvalidTransition("newsletter was already sent".to_string())),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for NewsletterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsletterStatus {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(NewsletterStatus::Draft),
            "scheduled" => Ok(NewsletterStatus::Scheduled),
            "sending" => Ok(NewsletterStatus::Sending),
            "sent" => Ok(NewsletterStatus::Sent),
            other => Err(MailError::UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for NewsletterStatus {
    type Error = MailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Editable fields of a newsletter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterInput {
    pub subject: String,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    /// Restricts the audience to persons carrying this tag
    #[serde(default)]
    pub audience_tag_id: Option<TagId>,
}

impl NewsletterInput {
    pub fn validate(&self) -> Result<(), MailError> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(MailError::InvalidNewsletter("subject is required".to_string()));
        }
        if subject.chars().count() > MAX_SUBJECT_LEN || subject.contains(['\r', '\n']) {
            return Err(MailError::InvalidNewsletter("subject is invalid".to_string()));
        }
        let blank = |body: &Option<String>| body.as_deref().map(|b| b.trim().is_empty()).unwrap_or(true);
        if blank(&self.body_text) && blank(&self.body_html) {
            return Err(MailError::InvalidNewsletter("a text or HTML body is required".to_string()));
        }
        Ok(())
    }
}

/// Fills `{{name}}` with the recipient's name, or "friend" when unknown
pub fn personalize(template: &str, name: Option<&str>) -> String {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(FALLBACK_NAME);
    template.replace(NAME_PLACEHOLDER, name)
}

/// Builds the copy of a newsletter sent to one recipient
pub fn message_for_recipient(
    from: &MailAddress,
    recipient: MailAddress,
    subject: &str,
    body_text: Option<&str>,
    body_html: Option<&str>,
) -> OutgoingMessage {
    let name = recipient.name.clone();
    OutgoingMessage {
        from: from.clone(),
        to: vec![recipient],
        cc: vec![],
        bcc: vec![],
        subject: personalize(subject, name.as_deref()),
        body_text: body_text.map(|b| personalize(b, name.as_deref())),
        body_html: body_html.map(|b| personalize(b, name.as_deref())),
        in_reply_to: None,
        message_id: None,
    }
}
