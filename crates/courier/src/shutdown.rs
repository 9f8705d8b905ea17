//! Signal-driven shutdown.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Install handlers for SIGINT (Ctrl+C) and SIGTERM.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal
/// arrives; the event loop watches it to stop starting new drains.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, shutting down");
        }

        handler_token.cancel();
    });

    token
}
