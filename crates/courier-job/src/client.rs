use async_trait::async_trait;

use crate::error::JobClientError;

/// Trait for reporting job outcomes back to the broker.
///
/// Implementations wrap whatever transport the broker speaks. The worker calls
/// at most one method per job.
#[async_trait]
pub trait JobClient: Send + Sync {
  /// Complete the job, merging `variables` into the workflow instance.
  async fn complete(
    &self,
    job_key: i64,
    variables: serde_json::Map<String, serde_json::Value>,
  ) -> Result<(), JobClientError>;

  /// Fail the job. The broker retries while `retries` is above zero.
  async fn fail(&self, job_key: i64, retries: u32, message: &str) -> Result<(), JobClientError>;

  /// Raise a named business error that the workflow model can catch.
  async fn throw_error(
    &self,
    job_key: i64,
    error_code: &str,
    message: &str,
  ) -> Result<(), JobClientError>;
}
