//! Error types for the crypto layer.

use thiserror::Error;

/// Errors that can occur while encrypting or decrypting message bodies.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No public key is registered for this contact number.
    #[error("contact number doesn't exist")]
    UnknownContact,

    /// Reading key material from disk failed.
    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),

    /// PGP operation failed.
    #[error("PGP error: {0}")]
    Pgp(#[from] pgp::errors::Error),

    /// Base64 unwrap of the transport encoding failed.
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decrypted payload is not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The PGP message carried no literal payload.
    #[error("message has no content")]
    EmptyMessage,
}
