//! SMTP transport adapter
//!
//! Delivers outgoing messages through an SMTP relay using lettre's async
//! tokio transport.
//!
//! # Configuration
//!
//! ```rust,ignore
//! let config = SmtpConfig {
//!     host: "smtp.example.org".to_string(),
//!     port: 587,
//!     username: Some("mailer".to_string()),
//!     password: Some("secret".to_string()),
//!     security: SmtpSecurity::StartTls,
//!     timeout_secs: 30,
//! };
//! let transport = SmtpTransport::new(&config)?;
//! ```

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::MailError;
use crate::message::{MailAddress, OutgoingMessage};
use crate::transport::MailTransport;

const TRANSPORT_NAME: &str = "smtp";

/// How the connection to the relay is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS, usually port 465
    Tls,
    /// STARTTLS upgrade, usually port 587
    #[default]
    StartTls,
    /// Plain text; only for local relays such as mailpit
    None,
}

/// Configuration for the SMTP relay
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub security: SmtpSecurity,
    pub timeout_secs: u64,
}

/// SMTP implementation of [`MailTransport`]
#[derive(Clone)]
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Builds the relay connection settings; no connection is opened yet
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = match config.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::transport(TRANSPORT_NAME, e.to_string()))?,
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::transport(TRANSPORT_NAME, e.to_string()))?,
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.clone()),
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            inner: builder.build(),
        })
    }
}

fn mailbox(address: &MailAddress) -> Result<Mailbox, MailError> {
    let parsed = address
        .address
        .parse()
        .map_err(|_| MailError::InvalidAddress(address.address.clone()))?;
    Ok(Mailbox::new(address.name.clone(), parsed))
}

/// Converts an outgoing message into a lettre message
pub(crate) fn build_message(message: &OutgoingMessage) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone())
        .message_id(message.message_id.clone());

    for address in &message.to {
        builder = builder.to(mailbox(address)?);
    }
    for address in &message.cc {
        builder = builder.cc(mailbox(address)?);
    }
    for address in &message.bcc {
        builder = builder.bcc(mailbox(address)?);
    }
    if let Some(ref in_reply_to) = message.in_reply_to {
        builder = builder
            .in_reply_to(in_reply_to.clone())
            .references(in_reply_to.clone());
    }

    let built = match (&message.body_text, &message.body_html) {
        (Some(text), Some(html)) => {
            builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
        }
        (None, Some(html)) => builder.header(ContentType::TEXT_HTML).body(html.clone()),
        (text, None) => builder
            .header(ContentType::TEXT_PLAIN)
            .body(text.clone().unwrap_or_default()),
    };

    built.map_err(|e| MailError::invalid_message(e.to_string()))
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        let email = build_message(message)?;
        match self.inner.send(email).await {
            Ok(response) => {
                debug!(code = %response.code(), message_id = ?message.message_id, "SMTP relay accepted message");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, message_id = ?message.message_id, "SMTP delivery failed");
                Err(MailError::transport(TRANSPORT_NAME, e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outgoing() -> OutgoingMessage {
        let mut message = OutgoingMessage {
            from: MailAddress::new("team@campaign.org", Some("Campaign")).unwrap(),
            to: vec![MailAddress::new("voter@example.com", Some("Voter")).unwrap()],
            cc: vec![],
            bcc: vec![MailAddress::new("archive@campaign.org", None).unwrap()],
            subject: "Polling place update".to_string(),
            body_text: Some("Your polling place moved.".to_string()),
            body_html: Some("<p>Your polling place moved.</p>".to_string()),
            in_reply_to: Some("<abc@example.com>".to_string()),
            message_id: None,
        };
        message.assign_message_id();
        message
    }

    #[test]
    fn test_build_message_headers() {
        let built = build_message(&outgoing()).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();

        assert!(raw.contains("Subject: Polling place update"));
        assert!(raw.contains("In-Reply-To: <abc@example.com>"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_build_message_text_only() {
        let mut message = outgoing();
        message.body_html = None;
        let raw = String::from_utf8(build_message(&message).unwrap().formatted()).unwrap();
        assert!(raw.contains("text/plain"));
    }

    #[tokio::test]
    async fn test_plain_relay_builds_without_connecting() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            security: SmtpSecurity::None,
            timeout_secs: 5,
        };
        assert!(SmtpTransport::new(&config).is_ok());
    }
}
