//! Configuration overlay.
//!
//! A job's effective configuration comes from several sources that may define
//! the same key. The [`Overlay`] keeps each source as a read-only layer and
//! applies precedence on lookup, highest first:
//!
//! 1. synthetic entries (`jobKey`, `processInstanceKey`)
//! 2. custom headers authored on the task
//! 3. job variables
//! 4. externally supplied variables (remote or local environment)
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//!
//! use courier_job::Job;
//! use courier_overlay::Overlay;
//!
//! let job = Job::new(1)
//!   .with_header("URL", "http://localhost/api/{{id}}")
//!   .with_variable("id", serde_json::json!(42));
//!
//! let overlay = Overlay::new(&job, &HashMap::new());
//!
//! assert_eq!(overlay.get_string_ignore_case("url").as_deref(), Some("http://localhost/api/{{id}}"));
//! assert_eq!(overlay.get("id"), Some(&serde_json::json!(42)));
//! ```

use std::collections::HashMap;

use courier_job::Job;
use serde_json::{Map, Value};

/// Overlay key holding the job identifier.
pub const JOB_KEY: &str = "jobKey";

/// Overlay key holding the correlation identifier.
pub const PROCESS_INSTANCE_KEY: &str = "processInstanceKey";

type Layer = Map<String, Value>;

/// Immutable, precedence-ordered view over one job's configuration sources.
///
/// Built fresh for every job and never shared between jobs.
#[derive(Debug, Clone)]
pub struct Overlay {
  /// Highest precedence first.
  layers: Vec<Layer>,
  /// All layers flattened, used as the template context.
  merged: Layer,
}

impl Overlay {
  /// Build the overlay for a job.
  pub fn new(job: &Job, external: &HashMap<String, String>) -> Self {
    let synthetic = Layer::from_iter([
      (JOB_KEY.to_string(), Value::from(job.key)),
      (
        PROCESS_INSTANCE_KEY.to_string(),
        Value::from(job.process_instance_key),
      ),
    ]);

    Self::from_layers(vec![
      synthetic,
      string_layer(&job.custom_headers),
      job.variables.clone(),
      string_layer(external),
    ])
  }

  fn from_layers(layers: Vec<Layer>) -> Self {
    // Lowest precedence is copied first so higher layers overwrite it.
    let mut merged = Layer::new();
    for layer in layers.iter().rev() {
      for (key, value) in layer {
        merged.insert(key.clone(), value.clone());
      }
    }

    Self { layers, merged }
  }

  /// Exact-key lookup, first layer in precedence order wins.
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.layers.iter().find_map(|layer| layer.get(key))
  }

  /// Case-insensitive lookup, first layer in precedence order wins.
  ///
  /// Within a layer an exact match is preferred over a case-insensitive one.
  /// `null` values are skipped.
  pub fn get_ignore_case(&self, key: &str) -> Option<&Value> {
    self.layers.iter().find_map(|layer| {
      layer.get(key).filter(|value| !value.is_null()).or_else(|| {
        layer
          .iter()
          .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_null())
          .map(|(_, v)| v)
      })
    })
  }

  /// [`Overlay::get_ignore_case`] converted to a string. An empty string counts as absent.
  pub fn get_string_ignore_case(&self, key: &str) -> Option<String> {
    self
      .get_ignore_case(key)
      .map(value_to_string)
      .filter(|value| !value.is_empty())
  }

  /// The flattened overlay, suitable as a template context.
  pub fn context(&self) -> &Map<String, Value> {
    &self.merged
  }
}

fn string_layer(values: &HashMap<String, String>) -> Layer {
  values
    .iter()
    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
    .collect()
}

fn value_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}
