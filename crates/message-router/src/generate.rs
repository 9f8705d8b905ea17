//! Construction of the worker set from configuration.

use std::sync::Arc;

use command_core::Whitelist;
use gateway_client::SmsGateway;
use service_catalog::ServiceConfig;
use text_crypto::ContactVault;
use tracing::info;

use crate::worker::{Link, SmsWorker};

/// Build one worker per distinct contact number across all services, plus
/// the loopback worker used by health probes.
///
/// Contacts listed under several services collapse to a single worker; every
/// `(service, contact)` pair is registered with the whitelist along the way.
/// The loopback worker never encrypts; the probe conversation is with
/// ourselves.
pub fn generate_workers(
    gateway_number: &str,
    services: &[ServiceConfig],
    gateway: Arc<dyn SmsGateway>,
    vault: Option<Arc<ContactVault>>,
    whitelist: &Whitelist,
) -> Vec<SmsWorker> {
    let mut workers = vec![SmsWorker::new(
        Link::new(gateway_number, gateway_number),
        Arc::clone(&gateway),
        None,
    )];

    for service in services {
        for contact in &service.client_numbers {
            if whitelist.client_exists(contact) {
                whitelist.add_client(&service.name, contact);
                continue;
            }

            workers.push(SmsWorker::new(
                Link::new(gateway_number, contact),
                Arc::clone(&gateway),
                vault.clone(),
            ));
            whitelist.add_client(&service.name, contact);
            info!(contact = %contact, "created worker for contact");
        }
    }

    workers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::Worker;
    use mock_gateway::MockGateway;

    fn service(name: &str, contacts: &[&str]) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            base_uri: "http://localhost:9".to_string(),
            client_numbers: contacts.iter().map(|c| c.to_string()).collect(),
            commands: Vec::new(),
        }
    }

    #[test]
    fn shared_contacts_collapse_to_one_worker() {
        let gateway: Arc<dyn SmsGateway> = Arc::new(MockGateway::new());
        let whitelist = Whitelist::new();
        let services = vec![
            service("lights", &["15551111111", "15552222222"]),
            service("locks", &["15551111111"]),
        ];

        let workers =
            generate_workers("15550000000", &services, gateway, None, &whitelist);

        // Loopback + two distinct contacts.
        assert_eq!(workers.len(), 3);
        assert!(workers[0].loopback());
        assert!(whitelist.client_authorized("lights", "15551111111"));
        assert!(whitelist.client_authorized("locks", "15551111111"));
        assert!(whitelist.client_authorized("lights", "15552222222"));
        assert!(!whitelist.client_authorized("locks", "15552222222"));
    }

    #[test]
    fn loopback_worker_is_always_first() {
        let gateway: Arc<dyn SmsGateway> = Arc::new(MockGateway::new());
        let whitelist = Whitelist::new();

        let workers = generate_workers("15550000000", &[], gateway, None, &whitelist);

        assert_eq!(workers.len(), 1);
        assert!(workers[0].loopback());
        assert_eq!(workers[0].recipient(), "15550000000");
    }
}
