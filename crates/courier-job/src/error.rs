use thiserror::Error;

/// Errors returned by a [`crate::JobClient`] implementation.
#[derive(Debug, Error)]
pub enum JobClientError {
  /// The broker could not be reached or rejected the command.
  #[error("broker command '{command}' for job {job_key} failed: {message}")]
  Command {
    command: &'static str,
    job_key: i64,
    message: String,
  },

  /// The job is no longer known to the broker (lease expired, already completed).
  #[error("job {job_key} not found")]
  NotFound { job_key: i64 },
}

impl JobClientError {
  pub fn command(command: &'static str, job_key: i64, message: impl Into<String>) -> Self {
    Self::Command {
      command,
      job_key,
      message: message.into(),
    }
  }
}
