//! The courier daemon: drains SMS conversations for commands and relays
//! them to backend services.

use std::sync::Arc;
use std::time::Duration;

use command_core::Whitelist;
use courier::config::CourierConfig;
use courier::shutdown;
use gateway_client::{GatewayClient, SmsGateway};
use message_router::{generate_workers, EventLoop};
use service_catalog::{Catalog, Service};
use text_crypto::ContactVault;
use tracing::info;

/// Delay before a drained worker is polled again.
const COOLDOWN: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = CourierConfig::load()?;

    let gateway = GatewayClient::connect(config.gateway.clone()).await?;
    let gateway: Arc<dyn SmsGateway> = Arc::new(gateway);

    let vault = if config.text_encryption {
        let vault = ContactVault::load(&config.encryption)?;
        info!("text encryption enabled");
        Some(Arc::new(vault))
    } else {
        None
    };

    let mut catalog = Catalog::new();
    for service_config in &config.services {
        catalog.add(Service::from_config(service_config)?);
    }

    let whitelist = Whitelist::new();
    let workers = generate_workers(
        &config.gateway_number,
        &config.services,
        Arc::clone(&gateway),
        vault,
        &whitelist,
    );

    let worker_count = workers.len();
    let event_loop = EventLoop::new(
        worker_count,
        worker_count,
        COOLDOWN,
        Arc::new(catalog),
        Arc::new(whitelist),
    );
    for worker in workers {
        event_loop.add_worker(worker).await;
    }

    let token = shutdown::install_signal_handler();
    info!(
        pid = std::process::id(),
        workers = worker_count,
        "courier started"
    );
    event_loop.run(token).await;

    Ok(())
}
