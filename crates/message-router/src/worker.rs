//! Per-conversation polling worker.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use command_core::UserInput;
use gateway_client::{GatewayError, SmsGateway};
use text_crypto::{ContactVault, CryptoError};
use thiserror::Error;
use tracing::{debug, error};

/// Minimum number of messages to request on the first window iteration.
const MIN_FETCH: u64 = 5;

/// Errors that can occur while sending a reply.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Gateway call failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Encrypting the outbound message failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Binds a gateway number with a contact number for one conversation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub gateway_number: String,
    pub contact_number: String,
}

impl Link {
    pub fn new(gateway_number: impl Into<String>, contact_number: impl Into<String>) -> Self {
        Self {
            gateway_number: gateway_number.into(),
            contact_number: contact_number.into(),
        }
    }

    /// A loopback link talks to the gateway's own number; only the
    /// health-check conversation does this.
    pub fn is_loopback(&self) -> bool {
        self.gateway_number
            .eq_ignore_ascii_case(&self.contact_number)
    }
}

/// One inbound message with its arrival timestamp (milliseconds since the
/// Unix epoch).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Text {
    message: String,
    timestamp: u64,
}

/// The operations the dispatcher needs from a worker.
///
/// `SmsWorker` is the production implementation; tests substitute scripted
/// workers.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Drain and parse all messages that arrived since the last drain.
    async fn fetch(&mut self) -> Vec<UserInput>;

    /// Send a reply to the conversation's contact.
    async fn send(&self, message: &str) -> Result<(), WorkerError>;

    /// Whether this worker's gateway and contact numbers are the same.
    fn loopback(&self) -> bool;

    /// The contact number this worker converses with.
    fn recipient(&self) -> &str;
}

/// A polling worker for one gateway↔contact conversation.
///
/// The watermark starts at wall-clock "now" so commands that predate process
/// start are never executed, and only ever moves forward.
pub struct SmsWorker {
    link: Link,
    watermark_ms: u64,
    gateway: Arc<dyn SmsGateway>,
    vault: Option<Arc<ContactVault>>,
}

impl SmsWorker {
    /// Create a worker. Passing a vault enables end-to-end encryption for
    /// this conversation.
    pub fn new(
        link: Link,
        gateway: Arc<dyn SmsGateway>,
        vault: Option<Arc<ContactVault>>,
    ) -> Self {
        let watermark_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            link,
            watermark_ms,
            gateway,
            vault,
        }
    }

    /// Fetch every message newer than the watermark, newest-first.
    ///
    /// The gateway has no cursor and answers "the newest N"; the window
    /// doubles each round (`prev * 2 + MIN_FETCH`) until either the size
    /// stops growing or the fetch has walked back past the watermark, so a
    /// burst of arrivals costs O(log) calls instead of a full history scan.
    async fn unprocessed_texts(&self) -> Result<Vec<Text>, GatewayError> {
        let mut texts;
        let mut prev_size: usize = 0;

        loop {
            let window = (prev_size as u64) * 2 + MIN_FETCH;
            texts = self.new_texts(window).await?;

            let current_size = texts.len();
            let past_watermark = prev_size > 0
                && texts
                    .last()
                    .is_some_and(|t| t.timestamp < self.watermark_ms);
            if current_size == prev_size || past_watermark {
                break;
            }
            prev_size = current_size;
        }

        // Everything at or below the watermark has already been handled;
        // keep the head of the newest-first list down to the oldest
        // unprocessed entry.
        let Some(oldest_index) = texts
            .iter()
            .rposition(|t| t.timestamp > self.watermark_ms)
        else {
            return Ok(Vec::new());
        };
        texts.truncate(oldest_index + 1);

        Ok(texts)
    }

    /// One history call, keeping only inbound messages.
    async fn new_texts(&self, num_messages: u64) -> Result<Vec<Text>, GatewayError> {
        let messages = self
            .gateway
            .contact_history(
                &self.link.gateway_number,
                &self.link.contact_number,
                num_messages,
            )
            .await?;

        Ok(messages
            .into_iter()
            .filter(|m| m.inbound)
            .map(|m| Text {
                message: m.contents,
                timestamp: m.timestamp as u64,
            })
            .collect())
    }
}

#[async_trait]
impl Worker for SmsWorker {
    async fn fetch(&mut self) -> Vec<UserInput> {
        let texts = match self.unprocessed_texts().await {
            Ok(texts) => texts,
            Err(e) => {
                error!(contact = %self.link.contact_number, error = %e, "drain failed");
                return Vec::new();
            }
        };
        if texts.is_empty() {
            return Vec::new();
        }

        let mut commands = Vec::new();
        for text in &texts {
            let message = match &self.vault {
                Some(vault) => match vault.decrypt(&self.link.contact_number, &text.message) {
                    Ok(message) => message,
                    Err(e) => {
                        error!(contact = %self.link.contact_number, error = %e, "failed to decrypt message");
                        continue;
                    }
                },
                None => text.message.clone(),
            };

            if let Ok(input) = UserInput::parse(&message) {
                commands.push(input);
            }
        }

        // The tail of the retained newest-first batch is the oldest message
        // just handled; the next drain starts strictly after it. Skipped
        // messages (crypto or parse failures) are left behind for good.
        self.watermark_ms = texts[texts.len() - 1].timestamp;
        debug!(
            contact = %self.link.contact_number,
            commands = commands.len(),
            watermark = self.watermark_ms,
            "drained conversation"
        );

        commands
    }

    async fn send(&self, message: &str) -> Result<(), WorkerError> {
        let mut body = encode(message);
        if let Some(vault) = &self.vault {
            body = vault.encrypt(&self.link.contact_number, &body)?;
        }

        self.gateway
            .send_sms(&self.link.gateway_number, &self.link.contact_number, &body)
            .await?;

        Ok(())
    }

    fn loopback(&self) -> bool {
        self.link.is_loopback()
    }

    fn recipient(&self) -> &str {
        &self.link.contact_number
    }
}

/// Normalize a message body for the gateway: quotes escaped exactly once,
/// newlines removed.
fn encode(message: &str) -> String {
    message
        .replace("\\\"", "\"")
        .replace('"', "\\\"")
        .replace('\n', "")
}
