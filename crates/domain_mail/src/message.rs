//! Addresses, outgoing messages and ingested emails

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::error::MailError;

/// RFC 5322 line length limit, applied to subjects
pub const MAX_SUBJECT_LEN: usize = 998;
pub const MAX_RECIPIENTS: usize = 500;
const SNIPPET_LEN: usize = 160;

/// An email address with an optional display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MailAddress {
    /// Creates a validated, lowercased address
    pub fn new(address: &str, name: Option<&str>) -> Result<Self, MailError> {
        let address = address.trim().to_lowercase();
        if !address.validate_email() {
            return Err(MailError::InvalidAddress(address));
        }
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if name.as_deref().map(|n| n.contains(['\r', '\n'])).unwrap_or(false) {
            return Err(MailError::InvalidAddress(format!("display name of {}", address)));
        }
        Ok(Self { address, name })
    }

    /// Re-checks an address that came in through deserialization
    pub fn validated(&self) -> Result<Self, MailError> {
        Self::new(&self.address, self.name.as_deref())
    }

    /// Domain part of the address
    pub fn domain(&self) -> &str {
        self.address.rsplit_once('@').map(|(_, d)| d).unwrap_or("localhost")
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(ref name) => write!(f, "{} <{}>", name, self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// How a recipient was addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

impl RecipientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::To => "to",
            RecipientKind::Cc => "cc",
            RecipientKind::Bcc => "bcc",
        }
    }
}

impl FromStr for RecipientKind {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to" => Ok(RecipientKind::To),
            "cc" => Ok(RecipientKind::Cc),
            "bcc" => Ok(RecipientKind::Bcc),
            other => Err(MailError::UnknownRecipientKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for RecipientKind {
    type Error = MailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A raw header stored alongside an email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

/// Metadata of an attachment; the content lives in external storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
}

/// A message about to be handed to a [`crate::MailTransport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub from: MailAddress,
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
    /// Message-ID of the email this replies to
    #[serde(default)]
    pub in_reply_to: Option<String>,
    /// Message-ID assigned by [`OutgoingMessage::assign_message_id`]
    #[serde(default)]
    pub message_id: Option<String>,
}

impl OutgoingMessage {
    /// Checks recipients, addresses, subject and body before sending
    pub fn validate(&self) -> Result<(), MailError> {
        let count = self.recipient_count();
        if count == 0 {
            return Err(MailError::invalid_message("at least one recipient is required"));
        }
        if count > MAX_RECIPIENTS {
            return Err(MailError::invalid_message(format!(
                "at most {} recipients are allowed",
                MAX_RECIPIENTS
            )));
        }
        self.from.validated()?;
        for recipient in self.all_recipients() {
            recipient.1.validated()?;
        }
        if self.subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(MailError::invalid_message("subject is too long"));
        }
        if self.subject.contains(['\r', '\n']) {
            return Err(MailError::invalid_message("subject cannot contain line breaks"));
        }
        let has_body = self.body_text.as_deref().map(|b| !b.trim().is_empty()).unwrap_or(false)
            || self.body_html.as_deref().map(|b| !b.trim().is_empty()).unwrap_or(false);
        if self.subject.trim().is_empty() && !has_body {
            return Err(MailError::invalid_message("a subject or a body is required"));
        }
        Ok(())
    }

    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Every recipient with how it was addressed, in to/cc/bcc order
    pub fn all_recipients(&self) -> impl Iterator<Item = (RecipientKind, &MailAddress)> {
        self.to
            .iter()
            .map(|a| (RecipientKind::To, a))
            .chain(self.cc.iter().map(|a| (RecipientKind::Cc, a)))
            .chain(self.bcc.iter().map(|a| (RecipientKind::Bcc, a)))
    }

    /// Gives the message a Message-ID on the sender's domain, once
    pub fn assign_message_id(&mut self) -> &str {
        let domain = self.from.domain().to_string();
        self.message_id
            .get_or_insert_with(|| format!("<{}@{}>", Uuid::new_v4(), domain))
            .as_str()
    }

    /// Preview text for inbox listings
    pub fn snippet(&self) -> String {
        snippet(self.body_text.as_deref(), self.body_html.as_deref())
    }
}

/// An email received from outside, as handed over by the mail ingest hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingEmail {
    pub from: MailAddress,
    #[serde(default)]
    pub to: Vec<MailAddress>,
    #[serde(default)]
    pub cc: Vec<MailAddress>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub headers: Vec<HeaderField>,
    #[serde(default)]
    pub attachments: Vec<AttachmentMeta>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl IncomingEmail {
    /// Validates the email and returns it with every address trimmed and
    /// lowercased and header names trimmed, the form it is stored in
    pub fn normalized(self) -> Result<Self, MailError> {
        let normalize = |list: Vec<MailAddress>| -> Result<Vec<MailAddress>, MailError> {
            list.iter().map(MailAddress::validated).collect()
        };
        let headers = self
            .headers
            .into_iter()
            .map(|header| {
                let name = header.name.trim();
                if name.is_empty() || name.contains([':', '\r', '\n']) {
                    return Err(MailError::invalid_message(format!("invalid header name '{}'", header.name)));
                }
                Ok(HeaderField {
                    name: name.to_string(),
                    value: header.value,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for attachment in &self.attachments {
            if attachment.filename.trim().is_empty() || attachment.size_bytes < 0 {
                return Err(MailError::invalid_message("invalid attachment metadata"));
            }
        }
        Ok(Self {
            from: self.from.validated()?,
            to: normalize(self.to)?,
            cc: normalize(self.cc)?,
            headers,
            ..self
        })
    }

    pub fn snippet(&self) -> String {
        snippet(self.body_text.as_deref(), self.body_html.as_deref())
    }
}

/// First 160 characters of the text body (or the tag-stripped HTML body),
/// with whitespace collapsed
pub fn snippet(body_text: Option<&str>, body_html: Option<&str>) -> String {
    let source = match (body_text, body_html) {
        (Some(text), _) if !text.trim().is_empty() => text.to_string(),
        (_, Some(html)) => strip_tags(html),
        _ => String::new(),
    };
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(SNIPPET_LEN).collect()
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
