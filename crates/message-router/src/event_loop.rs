//! The dispatch event loop.

use std::sync::Arc;
use std::time::Duration;

use command_core::Whitelist;
use service_catalog::{Catalog, CatalogError};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::worker::Worker;

type QueuedWorker = Box<dyn Worker>;

/// Bounded worker queue plus a fixed pool of drain tasks.
///
/// Every worker is enqueued once at startup. A pool task pulls a worker,
/// drains it, dispatches the resulting commands, and schedules the worker's
/// re-enqueue after the cooldown. The queue capacity matches the worker
/// count, so the initial fill never blocks and a worker is always in exactly
/// one place: the queue, a pool task, or the cooldown timer.
pub struct EventLoop {
    tx: mpsc::Sender<QueuedWorker>,
    rx: Arc<Mutex<mpsc::Receiver<QueuedWorker>>>,
    max_workers: usize,
    cooldown: Duration,
    catalog: Arc<Catalog>,
    whitelist: Arc<Whitelist>,
}

impl EventLoop {
    pub fn new(
        max_receivers: usize,
        max_workers: usize,
        cooldown: Duration,
        catalog: Arc<Catalog>,
        whitelist: Arc<Whitelist>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(max_receivers.max(1));

        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            max_workers,
            cooldown,
            catalog,
            whitelist,
        }
    }

    /// Enqueue a worker for draining.
    pub async fn add_worker(&self, worker: impl Worker + 'static) {
        if self.tx.send(Box::new(worker)).await.is_err() {
            error!("worker queue closed before startup completed");
        }
    }

    /// Run pool tasks until `shutdown` fires, then wait for the in-flight
    /// drains to finish. Re-enqueues sleeping in their cooldown at that
    /// point are abandoned with the queue.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(pool = self.max_workers, "starting event loop");

        let mut tasks = Vec::with_capacity(self.max_workers);
        for id in 0..self.max_workers {
            let rx = Arc::clone(&self.rx);
            let tx = self.tx.clone();
            let catalog = Arc::clone(&self.catalog);
            let whitelist = Arc::clone(&self.whitelist);
            let shutdown = shutdown.clone();
            let cooldown = self.cooldown;

            tasks.push(tokio::spawn(async move {
                loop {
                    let worker = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        worker = recv(&rx) => match worker {
                            Some(worker) => worker,
                            None => break,
                        },
                    };

                    let mut worker = worker;
                    process(&mut worker, &catalog, &whitelist).await;

                    let tx = tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(cooldown).await;
                        let _ = tx.send(worker).await;
                    });
                }
                debug!(task = id, "event loop task stopped");
            }));
        }

        for task in tasks {
            let _ = task.await;
        }
        info!("event loop drained");
    }
}

async fn recv(rx: &Arc<Mutex<mpsc::Receiver<QueuedWorker>>>) -> Option<QueuedWorker> {
    rx.lock().await.recv().await
}

/// Drain one worker and dispatch every command it produced.
async fn process(worker: &mut QueuedWorker, catalog: &Catalog, whitelist: &Whitelist) {
    for input in worker.fetch().await {
        // Health probes answer directly, no backend and no authorization.
        if input.name.eq_ignore_ascii_case("ping") {
            info!("handled ping probe");
            reply(worker.as_ref(), "pong").await;
            continue;
        }
        // On the loopback conversation our own pong comes right back; drop
        // it instead of answering the answer.
        if worker.loopback() && input.name.eq_ignore_ascii_case("pong") {
            continue;
        }

        let recipient = worker.recipient().to_string();
        if !whitelist.client_authorized(&input.name, &recipient) {
            warn!(
                contact = %recipient,
                command = %input.name,
                "unauthorized command attempt"
            );
            continue;
        }

        let service = match catalog.checkout(&input.name) {
            Ok(service) => service,
            Err(CatalogError::UnknownService(_)) => {
                warn!(command = %input.name, "no service registered for command");
                continue;
            }
            Err(e) => {
                error!(command = %input.name, error = %e, "service pool unavailable");
                reply(worker.as_ref(), "internal error, try later").await;
                continue;
            }
        };

        info!(command = %input.name, args = ?input.args, "executing command");
        let message = match service.execute(&input).await {
            Ok(message) => message,
            Err(CatalogError::NoMatchingCommand) => {
                warn!(command = %input.name, "input matched no command pattern");
                continue;
            }
            Err(e) => e.to_string(),
        };

        reply(worker.as_ref(), &message).await;
    }
}

async fn reply(worker: &dyn Worker, message: &str) {
    if let Err(e) = worker.send(message).await {
        error!(contact = %worker.recipient(), error = %e, "failed to send reply");
    }
}
