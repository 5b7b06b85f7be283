use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use courier_config::WorkerConfig;
use tracing::info;

use crate::env::EnvVariablesProvider;
use crate::error::ProviderError;
use crate::remote::RemoteConfigProvider;

/// A shared, read-only set of external variables.
pub type Variables = Arc<HashMap<String, String>>;

/// Source of the externally supplied overlay layer.
#[async_trait]
pub trait VariablesProvider: Send + Sync {
  /// Current variables. May hit the network; callers must not cache the result.
  async fn variables(&self) -> Result<Variables, ProviderError>;
}

/// Select the provider for a worker configuration.
///
/// A configured remote URL wins; otherwise prefixed variables are taken from the
/// local process environment.
pub fn from_config(config: &WorkerConfig) -> Result<Arc<dyn VariablesProvider>, ProviderError> {
  match config.remote.url() {
    Some(url) => {
      info!(
        url = %url,
        m2m = config.remote.m2m().is_some(),
        reload_interval_ms = config.remote.reload_interval_ms,
        "using remote variables"
      );
      Ok(Arc::new(RemoteConfigProvider::new(
        &config.remote,
        &config.http,
      )?))
    }
    None => {
      info!(prefix = %config.local.prefix, "using local environment variables");
      Ok(Arc::new(EnvVariablesProvider::from_process(&config.local)))
    }
  }
}
