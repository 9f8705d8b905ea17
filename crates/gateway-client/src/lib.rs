//! Client for the upstream SMS gateway.
//!
//! The gateway fronts the carrier conversation state and exposes four unary
//! RPC operations over JSON-RPC 2.0: sending a message, fetching the recent
//! history of one conversation, listing contacts, and listing the gateway's
//! own numbers. Conversation history comes back newest-first with no cursor;
//! the polling layer on top of this client is responsible for windowing.

mod client;
mod config;
mod error;
mod types;

pub use client::GatewayClient;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use types::{HistoryMessage, SmsGateway};
