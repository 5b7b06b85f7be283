use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading worker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The configuration file could not be read.
  #[error("failed to read config file '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The configuration file is not valid JSON for [`crate::WorkerConfig`].
  #[error("failed to parse config file '{}': {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// An environment variable held a value of the wrong shape.
  #[error("invalid value for {name}: '{value}' ({message})")]
  InvalidEnv {
    name: String,
    value: String,
    message: String,
  },
}

impl ConfigError {
  pub(crate) fn invalid_env(
    name: impl Into<String>,
    value: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::InvalidEnv {
      name: name.into(),
      value: value.into(),
      message: message.into(),
    }
  }
}
