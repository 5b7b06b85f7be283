//! Courier Job
//!
//! The boundary between courier and the workflow broker that delegates work to it.
//!
//! - [`Job`] is one task invocation handed to the worker, read-only for the
//!   duration of its handling.
//! - [`JobClient`] is the outbound completion protocol: exactly one of
//!   `complete`, `fail` or `throw_error` is called per job, or none when the
//!   job is left open for asynchronous completion.
//!
//! Polling, leasing and lock renewal belong to the broker adapter and are not
//! modelled here.

mod client;
mod error;
mod job;

pub use client::JobClient;
pub use error::JobClientError;
pub use job::Job;
