//! Error types for the service catalog.
//!
//! Display strings on the per-command variants are user-visible: the
//! dispatcher sends them back over SMS when a command fails.

use thiserror::Error;

/// Errors raised while building or executing service commands.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A command spec in configuration is invalid. Fatal at startup.
    #[error("invalid service spec: {0}")]
    InvalidSpec(String),

    /// No service is registered under this command name.
    #[error("unknown service \"{0}\"")]
    UnknownService(String),

    /// No pattern in the service's command table matched the utterance.
    #[error("no matching command")]
    NoMatchingCommand,

    /// Fewer positional arguments than the command binds.
    #[error("expected {expected} arguments, got {given}")]
    ArgCount { expected: usize, given: usize },

    /// An argument value is not in the allowed set.
    #[error("invalid value \"{value}\"")]
    FilterRejected { value: String },

    /// An argument value does not parse as the declared scalar type.
    #[error("invalid {expected} value \"{value}\"")]
    BadArgType {
        value: String,
        expected: &'static str,
    },

    /// The backend's response body did not contain the projected path.
    #[error("unexpected response from service: {0}")]
    BadResponse(String),

    /// The backend answered with a non-success status.
    #[error("{}", backend_display(.status, .body))]
    Backend { status: u16, body: String },

    /// The backend did not answer within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// Transport-level HTTP failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend's response body is not valid JSON.
    #[error("unexpected response from service: {0}")]
    Json(#[from] serde_json::Error),

    /// The service pool is unusable.
    #[error("internal error, try later")]
    Internal,
}

fn backend_display(status: &u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("service returned status {status}")
    } else {
        body.to_string()
    }
}
