//! The contact key vault and armor/unarmor operations.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pgp::composed::{Deserializable, Message, SignedPublicKey, SignedSecretKey};
use pgp::crypto::hash::HashAlgorithm;
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use rand::thread_rng;
use tracing::{info, warn};

use crate::config::CryptoConfig;
use crate::error::CryptoError;

/// Process-wide key material: the private key, its passphrase, and one
/// public key per contact number.
///
/// Built once at startup and shared read-only afterwards.
pub struct ContactVault {
    sig_verification: bool,
    base64_encoding: bool,
    passphrase: String,
    private_key: SignedSecretKey,
    contact_keys: HashMap<String, SignedPublicKey>,
}

impl ContactVault {
    /// Load the private key and every contact public key named in `config`.
    ///
    /// A missing or unparsable private key is fatal; individual contact key
    /// files that cannot be read or parsed are logged and skipped.
    pub fn load(config: &CryptoConfig) -> Result<Self, CryptoError> {
        let armored = fs::read_to_string(&config.private_key_file)?;
        let (private_key, _) = SignedSecretKey::from_string(&armored)?;

        let contact_keys = scan_contact_keys(Path::new(&config.contact_key_dir))?;
        info!(
            contacts = contact_keys.len(),
            "loaded contact public keys"
        );

        Ok(Self {
            sig_verification: config.sig_verification,
            base64_encoding: config.base64_encoding,
            passphrase: config.passphrase.clone(),
            private_key,
            contact_keys,
        })
    }

    /// Whether a public key is registered for this contact number.
    pub fn has_contact(&self, contact: &str) -> bool {
        self.contact_keys.contains_key(contact)
    }

    /// Decrypt a message body sent by a contact.
    ///
    /// Unwraps the transport Base64 layer when configured, then decrypts with
    /// the process private key. With signature verification enabled the
    /// signature must check out against the contact's public key.
    pub fn decrypt(&self, contact: &str, message: &str) -> Result<String, CryptoError> {
        let public_key = self
            .contact_keys
            .get(contact)
            .ok_or(CryptoError::UnknownContact)?;

        let armored = if self.base64_encoding {
            String::from_utf8(BASE64.decode(message.trim())?)?
        } else {
            message.to_string()
        };

        let (msg, _) = Message::from_string(&armored)?;
        let (mut decrypter, _) = msg.decrypt(|| self.passphrase.clone(), &[&self.private_key])?;
        let decrypted = decrypter
            .next()
            .ok_or(CryptoError::EmptyMessage)??;

        if self.sig_verification {
            decrypted.verify(public_key)?;
        }

        let content = decrypted.get_content()?.ok_or(CryptoError::EmptyMessage)?;
        Ok(String::from_utf8(content)?)
    }

    /// Encrypt a reply for a contact.
    ///
    /// The armored ciphertext is always Base64-wrapped on the way out; the
    /// gateway treats message bodies as a single line of text.
    pub fn encrypt(&self, contact: &str, message: &str) -> Result<String, CryptoError> {
        let public_key = self
            .contact_keys
            .get(contact)
            .ok_or(CryptoError::UnknownContact)?;

        let mut msg = Message::new_literal("", message);
        if self.sig_verification {
            msg = msg.sign(
                &self.private_key,
                || self.passphrase.clone(),
                HashAlgorithm::SHA2_256,
            )?;
        }

        let mut rng = thread_rng();
        let encrypted =
            msg.encrypt_to_keys(&mut rng, SymmetricKeyAlgorithm::AES256, &[public_key])?;
        let armored = encrypted.to_armored_string(None)?;

        Ok(BASE64.encode(armored))
    }
}

impl std::fmt::Debug for ContactVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactVault")
            .field("sig_verification", &self.sig_verification)
            .field("base64_encoding", &self.base64_encoding)
            .field("contacts", &self.contact_keys.len())
            .finish()
    }
}

/// Scan `dir/*.asc`, registering each parsable key under the file stem.
fn scan_contact_keys(dir: &Path) -> Result<HashMap<String, SignedPublicKey>, CryptoError> {
    let mut keys = HashMap::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("asc") {
            continue;
        }
        let Some(contact) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let armored = match fs::read_to_string(&path) {
            Ok(armored) => armored,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable key file");
                continue;
            }
        };
        match SignedPublicKey::from_string(&armored) {
            Ok((key, _)) => {
                keys.insert(contact.to_string(), key);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unparsable key file");
            }
        }
    }

    Ok(keys)
}
