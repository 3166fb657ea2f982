//! Outbound mail port
//!
//! Application code depends on [`MailTransport`] only. The concrete
//! transport is chosen at startup: SMTP when a relay is configured,
//! [`LoggingTransport`] otherwise.

use async_trait::async_trait;
use tracing::info;

use crate::error::MailError;
use crate::message::OutgoingMessage;

/// Delivers outgoing messages
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Delivers a validated message that already carries a Message-ID
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError>;
}

/// Transport that only logs; used when no SMTP relay is configured
#[derive(Debug, Default, Clone)]
pub struct LoggingTransport;

#[async_trait]
impl MailTransport for LoggingTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            recipients = message.recipient_count(),
            subject = %message.subject,
            message_id = message.message_id.as_deref().unwrap_or(""),
            "Mail not delivered (logging transport)"
        );
        Ok(())
    }
}

/// Recording implementation of MailTransport for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Keeps every message it is asked to send
    #[derive(Debug, Default, Clone)]
    pub struct RecordingTransport {
        sent: Arc<Mutex<Vec<OutgoingMessage>>>,
        fail_for: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes delivery fail for messages addressed to `address`
        pub async fn fail_for(&self, address: impl Into<String>) {
            self.fail_for.lock().await.push(address.into());
        }

        pub async fn sent(&self) -> Vec<OutgoingMessage> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
            let failing = self.fail_for.lock().await;
            if let Some((_, address)) = message
                .all_recipients()
                .find(|(_, a)| failing.contains(&a.address))
            {
                return Err(MailError::transport(self.name(), format!("rejected {}", address.address)));
            }
            drop(failing);
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }
}
