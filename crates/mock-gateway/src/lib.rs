//! Scripted in-memory gateway for tests.
//!
//! The mock plays back a queue of conversation snapshots: each call to
//! `contact_history` pops the next snapshot (the last one repeats once the
//! queue is empty), truncated to the requested message count the way the
//! real gateway honors its upper bound. Outbound messages are recorded for
//! assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use gateway_client::{GatewayError, HistoryMessage, SmsGateway};

/// One outbound message recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub gateway_number: String,
    pub contact_number: String,
    pub message: String,
}

/// A scripted [`SmsGateway`] implementation.
#[derive(Debug, Default)]
pub struct MockGateway {
    script: Mutex<VecDeque<Vec<HistoryMessage>>>,
    current: Mutex<Vec<HistoryMessage>>,
    history_calls: AtomicUsize,
    sent: Mutex<Vec<SentSms>>,
    fail_history: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next conversation snapshot (newest-first, like the real
    /// gateway).
    pub fn push_history(&self, messages: Vec<HistoryMessage>) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(messages);
    }

    /// Make every subsequent `contact_history` call fail with this message.
    pub fn fail_history(&self, error: impl Into<String>) {
        *self.fail_history.lock().expect("mock lock poisoned") = Some(error.into());
    }

    /// How many times `contact_history` has been called.
    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    /// Every message sent through the mock so far.
    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    /// Convenience constructor for an inbound history message.
    pub fn inbound(contents: &str, timestamp: i64) -> HistoryMessage {
        HistoryMessage {
            inbound: true,
            contents: contents.to_string(),
            timestamp,
        }
    }

    /// Convenience constructor for an outbound history message.
    pub fn outbound(contents: &str, timestamp: i64) -> HistoryMessage {
        HistoryMessage {
            inbound: false,
            contents: contents.to_string(),
            timestamp,
        }
    }
}

#[async_trait]
impl SmsGateway for MockGateway {
    async fn send_sms(
        &self,
        gateway_number: &str,
        contact_number: &str,
        message: &str,
    ) -> Result<(), GatewayError> {
        self.sent.lock().expect("mock lock poisoned").push(SentSms {
            gateway_number: gateway_number.to_string(),
            contact_number: contact_number.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn contact_history(
        &self,
        _gateway_number: &str,
        _contact_number: &str,
        num_messages: u64,
    ) -> Result<Vec<HistoryMessage>, GatewayError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.fail_history.lock().expect("mock lock poisoned").clone() {
            return Err(GatewayError::Gateway(error));
        }

        let mut current = self.current.lock().expect("mock lock poisoned");
        if let Some(next) = self
            .script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
        {
            *current = next;
        }

        let capped = current.len().min(num_messages as usize);
        Ok(current[..capped].to_vec())
    }

    async fn contact_list(&self, _gateway_number: &str) -> Result<Vec<String>, GatewayError> {
        Ok(Vec::new())
    }

    async fn gateway_numbers(&self) -> Result<Vec<String>, GatewayError> {
        Ok(Vec::new())
    }
}
