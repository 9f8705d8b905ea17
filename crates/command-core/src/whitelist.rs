//! Authorization registry for contact numbers.

use std::collections::HashSet;
use std::sync::RwLock;

use tracing::debug;

/// Registry of known contact numbers and the services each may use.
///
/// Membership is tracked with two key shapes: a bare contact number marks the
/// contact as known, and a `"{service}-{contact}"` composite marks the pair as
/// authorized. Entries are written during startup wiring only; reads are
/// concurrent for the rest of the process lifetime.
#[derive(Debug, Default)]
pub struct Whitelist {
    entries: RwLock<HashSet<String>>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize a contact number for a service, registering the contact as
    /// known in the process.
    pub fn add_client(&self, service: &str, contact: &str) {
        let mut entries = self.entries.write().expect("whitelist lock poisoned");
        entries.insert(format!("{service}-{contact}"));
        entries.insert(contact.to_string());
        debug!(service, contact, "whitelisted contact for service");
    }

    /// Whether this contact number has been registered before.
    pub fn client_exists(&self, contact: &str) -> bool {
        self.entries
            .read()
            .expect("whitelist lock poisoned")
            .contains(contact)
    }

    /// Whether this contact number is authorized to use the named service.
    pub fn client_authorized(&self, service: &str, contact: &str) -> bool {
        self.entries
            .read()
            .expect("whitelist lock poisoned")
            .contains(&format!("{service}-{contact}"))
    }
}
