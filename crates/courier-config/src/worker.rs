use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Connection establishment timeout for outbound calls.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// End-to-end response timeout for outbound calls.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 60_000;

/// How long fetched remote variables stay fresh.
pub const DEFAULT_RELOAD_INTERVAL_MS: u64 = 15_000;

/// Prefix selecting local environment variables.
pub const DEFAULT_LOCAL_PREFIX: &str = "COURIER_ENV_";

/// Top-level worker configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  pub http: HttpSettings,
  pub remote: RemoteVariablesSettings,
  pub local: LocalVariablesSettings,
}

impl WorkerConfig {
  /// Load configuration from a JSON file. Missing fields fall back to defaults.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// Timeouts for outbound HTTP calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
  pub connect_timeout_ms: u64,
  pub response_timeout_ms: u64,
}

impl Default for HttpSettings {
  fn default() -> Self {
    Self {
      connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
      response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
    }
  }
}

impl HttpSettings {
  pub fn connect_timeout(&self) -> Duration {
    Duration::from_millis(self.connect_timeout_ms)
  }

  pub fn response_timeout(&self) -> Duration {
    Duration::from_millis(self.response_timeout_ms)
  }
}

/// Where remote variables are fetched from and how long they are cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteVariablesSettings {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  pub reload_interval_ms: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub m2m: Option<M2mSettings>,
}

impl Default for RemoteVariablesSettings {
  fn default() -> Self {
    Self {
      url: None,
      reload_interval_ms: DEFAULT_RELOAD_INTERVAL_MS,
      m2m: None,
    }
  }
}

impl RemoteVariablesSettings {
  /// The configured URL, treating an empty string as unset.
  pub fn url(&self) -> Option<&str> {
    self.url.as_deref().filter(|url| !url.is_empty())
  }

  /// M2M credentials, present only when a token endpoint is set.
  pub fn m2m(&self) -> Option<&M2mSettings> {
    self.m2m.as_ref().filter(|m2m| !m2m.base_url.is_empty())
  }

  pub fn reload_interval(&self) -> Duration {
    Duration::from_millis(self.reload_interval_ms)
  }
}

/// Client-credentials exchange parameters.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct M2mSettings {
  pub base_url: String,
  pub client_id: String,
  pub client_secret: String,
  pub audience: String,
}

// Keeps the secret out of logs and panics.
impl std::fmt::Debug for M2mSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("M2mSettings")
      .field("base_url", &self.base_url)
      .field("client_id", &self.client_id)
      .field("client_secret", &"<redacted>")
      .field("audience", &self.audience)
      .finish()
  }
}

/// Selection of variables from the local process environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalVariablesSettings {
  pub prefix: String,
  pub remove_prefix: bool,
}

impl Default for LocalVariablesSettings {
  fn default() -> Self {
    Self {
      prefix: DEFAULT_LOCAL_PREFIX.to_string(),
      remove_prefix: true,
    }
  }
}
