//! Encryption configuration.

use serde::{Deserialize, Serialize};

/// Options and key material locations for the crypto layer.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CryptoConfig {
    /// Verify (and produce) signatures in addition to encrypting.
    #[serde(default)]
    pub sig_verification: bool,
    /// Message bodies are Base64-wrapped around the PGP armor.
    #[serde(default)]
    pub base64_encoding: bool,
    /// The process public key file (armored). Distributed to contacts out of
    /// band; not read by the vault itself.
    #[serde(default)]
    pub public_key_file: String,
    /// The process private key file (armored).
    #[serde(default)]
    pub private_key_file: String,
    /// Passphrase protecting the private key.
    #[serde(default)]
    pub passphrase: String,
    /// Directory holding one `<contact-number>.asc` public key per contact.
    #[serde(default)]
    pub contact_key_dir: String,
}
