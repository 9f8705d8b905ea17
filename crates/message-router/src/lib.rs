//! Polling workers and the dispatch event loop.
//!
//! One [`SmsWorker`] exists per gateway↔contact conversation. The
//! [`EventLoop`] cycles every worker through a bounded queue: a pool task
//! drains the worker's new messages, dispatches the parsed commands to the
//! service catalog, and re-enqueues the worker after a cooldown.

mod event_loop;
mod generate;
mod worker;

pub use event_loop::EventLoop;
pub use generate::generate_workers;
pub use worker::{Link, SmsWorker, Worker, WorkerError};
