//! Error types for the gateway client.

use thiserror::Error;

/// Errors that can occur when talking to the SMS gateway.
///
/// Transport failures and application-level failures (the gateway answering
/// with `success = false`) are deliberately the same type: callers abort the
/// current drain either way and retry after the cooldown.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON-RPC error response from the gateway.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// The gateway reported an application-level failure.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Connection to the gateway failed.
    #[error("connection failed: {0}")]
    Connection(String),
}
