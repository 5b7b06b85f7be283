use thiserror::Error;

/// Errors from the worker loop.
#[derive(Debug, Error)]
pub enum WorkerError {
  /// The worker is no longer accepting jobs.
  #[error("job worker channel closed")]
  ChannelClosed,
}
