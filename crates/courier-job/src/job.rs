use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One task invocation delegated by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
  /// Opaque job identifier, used when reporting the outcome.
  pub key: i64,

  /// Identifier correlating this job with its workflow instance.
  #[serde(default)]
  pub process_instance_key: i64,

  /// Static metadata authored on the task definition.
  #[serde(default)]
  pub custom_headers: HashMap<String, String>,

  /// Workflow variables visible to the task.
  #[serde(default)]
  pub variables: serde_json::Map<String, serde_json::Value>,

  /// Remaining retries as seen by the broker.
  #[serde(default)]
  pub retries: u32,
}

impl Job {
  pub fn new(key: i64) -> Self {
    Self {
      key,
      process_instance_key: 0,
      custom_headers: HashMap::new(),
      variables: serde_json::Map::new(),
      retries: 0,
    }
  }

  pub fn with_process_instance_key(mut self, process_instance_key: i64) -> Self {
    self.process_instance_key = process_instance_key;
    self
  }

  pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.custom_headers.insert(key.into(), value.into());
    self
  }

  pub fn with_variable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.variables.insert(key.into(), value);
    self
  }

  pub fn with_retries(mut self, retries: u32) -> Self {
    self.retries = retries;
    self
  }
}
