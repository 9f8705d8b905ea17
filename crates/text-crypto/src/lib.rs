//! PGP armor for message bodies, keyed by contact number.
//!
//! When text encryption is enabled, every inbound message body is an
//! ASCII-armored PGP message (optionally Base64-wrapped for transport) and
//! every outbound reply is armored the same way for the contact's public
//! key. Keys are loaded once at startup: the process private key from a
//! file, and one public key per contact from `<dir>/<contact-number>.asc`.

mod config;
mod error;
mod vault;

pub use config::CryptoConfig;
pub use error::CryptoError;
pub use vault::ContactVault;
