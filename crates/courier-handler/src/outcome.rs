use courier_job::{Job, JobClient, JobClientError};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::HandlerError;

/// The result of handling one job. Exactly one is produced per job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
  /// Complete the job with these result variables.
  Complete { variables: Map<String, Value> },
  /// Fail the job, leaving `retries` attempts.
  Fail { retries: u32, message: String },
  /// Raise a business error the workflow can catch.
  ThrowError { error_code: String, message: String },
  /// Leave the job open for an asynchronous completion.
  Pending,
}

impl JobOutcome {
  /// Map a handler error to the failure reported to the broker.
  ///
  /// Retryable errors use up one attempt. Configuration defects exhaust retries.
  pub fn from_error(job: &Job, error: &HandlerError) -> Self {
    let retries = if error.is_retryable() {
      job.retries.saturating_sub(1)
    } else {
      0
    };

    JobOutcome::Fail {
      retries,
      message: error.to_string(),
    }
  }

  /// Report this outcome for `job_key`. `Pending` makes no call.
  pub async fn report(self, job_key: i64, client: &dyn JobClient) -> Result<(), JobClientError> {
    match self {
      JobOutcome::Complete { variables } => {
        info!(job_key, "job_completed");
        client.complete(job_key, variables).await
      }
      JobOutcome::Fail { retries, message } => {
        warn!(job_key, retries, message = %message, "job_failed");
        client.fail(job_key, retries, &message).await
      }
      JobOutcome::ThrowError {
        error_code,
        message,
      } => {
        warn!(job_key, error_code = %error_code, "job_error_thrown");
        client.throw_error(job_key, &error_code, &message).await
      }
      JobOutcome::Pending => {
        info!(job_key, "job_pending");
        Ok(())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_retryable_error_uses_one_attempt() {
    let job = Job::new(1).with_retries(3);
    let error = HandlerError::Timeout {
      url: "http://localhost".to_string(),
    };

    assert_eq!(
      JobOutcome::from_error(&job, &error),
      JobOutcome::Fail {
        retries: 2,
        message: "request to 'http://localhost' timed out".to_string(),
      }
    );
  }

  #[test]
  fn test_configuration_defect_exhausts_retries() {
    let job = Job::new(1).with_retries(3);
    let error = HandlerError::MissingParameter { name: "url" };

    match JobOutcome::from_error(&job, &error) {
      JobOutcome::Fail { retries, message } => {
        assert_eq!(retries, 0);
        assert!(message.contains("url"));
      }
      other => panic!("expected fail, got {:?}", other),
    }
  }

  #[test]
  fn test_serialized_shape() {
    let outcome = JobOutcome::ThrowError {
      error_code: "some-code".to_string(),
      message: "some message".to_string(),
    };

    assert_eq!(
      serde_json::to_value(&outcome).unwrap(),
      json!({ "outcome": "throw_error", "error_code": "some-code", "message": "some message" })
    );
    assert_eq!(
      serde_json::to_value(JobOutcome::Pending).unwrap(),
      json!({ "outcome": "pending" })
    );
  }
}
