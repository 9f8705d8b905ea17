//! Gateway operations and wire-level message shapes.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GatewayError;

/// One message from a conversation history, as reported by the gateway.
///
/// `inbound` is true when the contact sent the message (wire field `source`);
/// `timestamp` is milliseconds since the Unix epoch. The gateway returns
/// histories newest-first.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    #[serde(rename = "source")]
    pub inbound: bool,
    #[serde(rename = "messageContents")]
    pub contents: String,
    pub timestamp: i64,
}

/// The four unary operations the SMS gateway exposes.
///
/// The trait exists so the polling layer can run against a scripted gateway
/// in tests; [`GatewayClient`](crate::GatewayClient) is the production
/// implementation.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send a text message from a gateway number to a contact.
    async fn send_sms(
        &self,
        gateway_number: &str,
        contact_number: &str,
        message: &str,
    ) -> Result<(), GatewayError>;

    /// Fetch up to `num_messages` of the most recent messages in the
    /// conversation, newest-first. The gateway may return fewer.
    async fn contact_history(
        &self,
        gateway_number: &str,
        contact_number: &str,
        num_messages: u64,
    ) -> Result<Vec<HistoryMessage>, GatewayError>;

    /// List contact numbers known to a gateway number.
    async fn contact_list(&self, gateway_number: &str) -> Result<Vec<String>, GatewayError>;

    /// List the phone numbers owned by the gateway itself.
    async fn gateway_numbers(&self) -> Result<Vec<String>, GatewayError>;
}
