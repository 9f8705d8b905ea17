//! Liveness probe for a running courier daemon.
//!
//! Sends "ping" on the gateway's loopback conversation, waits for the
//! daemon's polling cycle to answer, and checks for "pong". Exits 0 when
//! the pong arrives, 1 otherwise.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use courier::config::CourierConfig;
use gateway_client::GatewayClient;
use message_router::{Link, SmsWorker, Worker};
use tracing::{error, info};

/// How long to give the daemon to notice the ping and reply.
const REPLY_WAIT: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    match ping().await {
        Ok(true) => {
            info!("pong received, daemon is up");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!("no pong received");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "health check failed");
            ExitCode::FAILURE
        }
    }
}

/// Send a ping over the loopback conversation and look for the answer.
async fn ping() -> Result<bool, Box<dyn std::error::Error>> {
    let config = CourierConfig::load()?;
    let gateway = GatewayClient::new(config.gateway.clone())?;

    // The worker is built before the send, so its watermark excludes history
    // and the drain below sees only the exchange triggered here.
    let mut probe = SmsWorker::new(
        Link::new(&config.gateway_number, &config.gateway_number),
        Arc::new(gateway),
        None,
    );

    info!(number = %config.gateway_number, "sending ping");
    probe.send("ping").await?;
    tokio::time::sleep(REPLY_WAIT).await;

    let answered = probe
        .fetch()
        .await
        .iter()
        .any(|input| input.name.eq_ignore_ascii_case("pong"));

    Ok(answered)
}
