//! Batch notifications.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::error::NotifyError;
use crate::formatters::{batch_subject, format_batch_html, format_batch_plain};
use crate::models::Paper;

/// Delivers one batch of papers per source.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `papers` from `source`. `true` means delivered.
    async fn send_batch(&self, source: &str, symbol: &str, papers: &[Paper]) -> bool;
}

/// Sends multipart mail over an authenticated STARTTLS relay.
pub struct EmailNotifier {
    from: Mailbox,
    to: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    /// Build the transport from `config`. No connection is made yet.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config.username.parse()?;
        let to: Mailbox = config.to.parse()?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { from, to, mailer })
    }

    /// Assemble the message for one batch.
    pub fn build_message(&self, source: &str, symbol: &str, papers: &[Paper]) -> Result<Message, NotifyError> {
        let body = MultiPart::alternative_plain_html(
            format_batch_plain(source, papers),
            format_batch_html(source, symbol, papers),
        );
        Ok(Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(batch_subject(symbol, papers.len()))
            .multipart(body)?)
    }

    async fn deliver(&self, source: &str, symbol: &str, papers: &[Paper]) -> Result<(), NotifyError> {
        let message = self.build_message(source, symbol, papers)?;
        self.mailer.send(message).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send_batch(&self, source: &str, symbol: &str, papers: &[Paper]) -> bool {
        if papers.is_empty() {
            return true;
        }
        match self.deliver(source, symbol, papers).await {
            Ok(()) => {
                tracing::info!(source = %source, papers = papers.len(), "Sent batch");
                true
            }
            Err(e) => {
                tracing::error!(source = %source, papers = papers.len(), error = %e, "Failed to send batch");
                false
            }
        }
    }
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier").field("from", &self.from).field("to", &self.to).finish_non_exhaustive()
    }
}
