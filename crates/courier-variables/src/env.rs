use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_config::LocalVariablesSettings;

use crate::error::ProviderError;
use crate::provider::{Variables, VariablesProvider};

/// Variables selected from the local environment by prefix.
///
/// The environment is captured once, at construction.
pub struct EnvVariablesProvider {
  variables: Variables,
}

impl EnvVariablesProvider {
  /// Capture the current process environment.
  pub fn from_process(settings: &LocalVariablesSettings) -> Self {
    Self::new(std::env::vars(), settings)
  }

  /// Select from an explicit set of raw variables.
  ///
  /// Keys must start with the configured prefix, compared case-insensitively.
  /// With `remove_prefix` the prefix is stripped from the resulting key.
  pub fn new<I>(raw: I, settings: &LocalVariablesSettings) -> Self
  where
    I: IntoIterator<Item = (String, String)>,
  {
    let prefix = settings.prefix.as_str();

    let variables: HashMap<String, String> = raw
      .into_iter()
      .filter(|(key, _)| has_prefix(key, prefix))
      .map(|(key, value)| {
        if settings.remove_prefix {
          (key[prefix.len()..].to_string(), value)
        } else {
          (key, value)
        }
      })
      .collect();

    Self {
      variables: Arc::new(variables),
    }
  }
}

#[async_trait]
impl VariablesProvider for EnvVariablesProvider {
  async fn variables(&self) -> Result<Variables, ProviderError> {
    Ok(self.variables.clone())
  }
}

fn has_prefix(key: &str, prefix: &str) -> bool {
  key
    .get(..prefix.len())
    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
