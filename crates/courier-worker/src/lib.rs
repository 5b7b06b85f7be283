//! Courier job worker.
//!
//! The broker polling adapter pushes [`courier_job::Job`]s into the worker's
//! channel. Each job runs on its own task through the
//! [`courier_handler::HttpJobHandler`] and its outcome is reported through a
//! [`courier_job::JobClient`].
//!
//! ```text
//! ┌──────────────┐  Job   ┌─────────────────────────────┐
//! │ poll adapter │ ─────▶ │ JobWorker                   │
//! └──────────────┘        │  - mpsc intake              │
//!                         │  - bounded in-flight jobs   │
//!                         └─────────────────────────────┘
//!                                       │
//!                                       ▼
//!                         ┌─────────────────────────────┐
//!                         │ HttpJobHandler → JobOutcome │
//!                         └─────────────────────────────┘
//!                                       │
//!                                       ▼
//!                         ┌─────────────────────────────┐
//!                         │ JobClient                   │
//!                         │  complete / fail / throw    │
//!                         └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let worker = JobWorker::new(handler, client);
//! let sender = worker.sender();
//!
//! let cancel = CancellationToken::new();
//! tokio::spawn(worker.start(cancel.clone()));
//!
//! sender.send(job).await?;
//! ```

mod error;
mod worker;

pub use error::WorkerError;
pub use worker::{DEFAULT_MAX_JOBS_ACTIVE, JobWorker};
