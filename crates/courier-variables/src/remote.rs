//! Remote variables with a time-to-live cache and M2M authorization.
//!
//! One mutex guards both the cache and the token. It is held across the
//! network round trip, so concurrent jobs finding a stale cache wait for a
//! single fetch instead of each hitting the endpoint, and a token dropped after
//! a 401/403 cannot be overwritten by a request still using the old one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use courier_config::{HttpSettings, M2mSettings, RemoteVariablesSettings};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::ProviderError;
use crate::provider::{Variables, VariablesProvider};
use crate::token;

/// One record of the remote payload. Non-string values are accepted.
#[derive(Deserialize)]
struct RemoteVariable {
  key: String,
  #[serde(default)]
  value: serde_json::Value,
}

struct CachedVariables {
  variables: Variables,
  fetched_at: Instant,
}

#[derive(Default)]
struct State {
  cache: Option<CachedVariables>,
  token: Option<String>,
}

/// Fetches variables from a remote endpoint and caches them process-wide.
pub struct RemoteConfigProvider {
  client: Client,
  url: Option<String>,
  reload_interval: Duration,
  m2m: Option<M2mSettings>,
  state: Mutex<State>,
}

impl RemoteConfigProvider {
  /// Create a provider with its own HTTP client bounded by `http` timeouts.
  pub fn new(settings: &RemoteVariablesSettings, http: &HttpSettings) -> Result<Self, ProviderError> {
    let client = Client::builder()
      .connect_timeout(http.connect_timeout())
      .timeout(http.response_timeout())
      .build()
      .map_err(|source| ProviderError::Client { source })?;

    Ok(Self::with_client(client, settings))
  }

  /// Create a provider that shares an existing HTTP client.
  pub fn with_client(client: Client, settings: &RemoteVariablesSettings) -> Self {
    Self {
      client,
      url: settings.url().map(str::to_string),
      reload_interval: settings.reload_interval(),
      m2m: settings.m2m().cloned(),
      state: Mutex::new(State::default()),
    }
  }

  /// Current variables, from cache while fresh, otherwise fetched.
  ///
  /// Without a configured URL this returns an empty map and never touches the network.
  #[instrument(name = "remote_variables", skip(self), fields(url = self.url.as_deref().unwrap_or("")))]
  pub async fn get_variables(&self) -> Result<Variables, ProviderError> {
    let Some(url) = self.url.as_deref() else {
      return Ok(Variables::default());
    };

    let mut state = self.state.lock().await;

    if let Some(cached) = &state.cache {
      if cached.fetched_at.elapsed() < self.reload_interval {
        debug!("variables_cache_hit");
        return Ok(cached.variables.clone());
      }
    }

    let variables = self.fetch(url, &mut state).await?;

    state.cache = Some(CachedVariables {
      variables: variables.clone(),
      fetched_at: Instant::now(),
    });

    info!(count = variables.len(), "variables_fetched");

    Ok(variables)
  }

  async fn fetch(&self, url: &str, state: &mut State) -> Result<Variables, ProviderError> {
    let mut response = self.send(url, state).await?;

    if matches!(
      response.status(),
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
      warn!(
        status = response.status().as_u16(),
        "variables_unauthorized, refreshing token"
      );
      state.token = None;
      response = self.send(url, state).await?;
    }

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|source| ProviderError::Request {
        url: url.to_string(),
        source,
      })?;

    if status != StatusCode::OK {
      return Err(ProviderError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
      });
    }

    parse_variables(url, &body).map(Arc::new)
  }

  async fn send(&self, url: &str, state: &mut State) -> Result<Response, ProviderError> {
    let mut request = self.client.get(url).header(ACCEPT, "application/json");

    if let Some(m2m) = &self.m2m {
      let token = match &state.token {
        Some(token) => token.clone(),
        None => {
          let token = token::acquire(&self.client, m2m).await?;
          state.token = Some(token.clone());
          token
        }
      };
      request = request.header(AUTHORIZATION, token);
    }

    request
      .send()
      .await
      .map_err(|source| ProviderError::Request {
        url: url.to_string(),
        source,
      })
  }
}

#[async_trait]
impl VariablesProvider for RemoteConfigProvider {
  async fn variables(&self) -> Result<Variables, ProviderError> {
    self.get_variables().await
  }
}

/// Parse a `[{"key": .., "value": ..}]` payload. A blank body is an empty list.
fn parse_variables(url: &str, body: &str) -> Result<HashMap<String, String>, ProviderError> {
  if body.trim().is_empty() {
    return Ok(HashMap::new());
  }

  let records: Vec<RemoteVariable> =
    serde_json::from_str(body).map_err(|e| ProviderError::Decode {
      url: url.to_string(),
      message: e.to_string(),
    })?;

  Ok(
    records
      .into_iter()
      .filter_map(|record| {
        let value = match record.value {
          serde_json::Value::Null => return None,
          serde_json::Value::String(s) => s,
          other => other.to_string(),
        };
        Some((record.key, value))
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  const URL: &str = "http://config.local/vars";

  #[test]
  fn test_parse_records() {
    let vars = parse_variables(
      URL,
      r#"[ {"key": "x", "value": "1"}, {"key": "y", "value": "two"} ]"#,
    )
    .unwrap();

    assert_eq!(vars.len(), 2);
    assert_eq!(vars["x"], "1");
    assert_eq!(vars["y"], "two");
  }

  #[test]
  fn test_parse_non_string_values() {
    let vars = parse_variables(
      URL,
      r#"[ {"key": "x", "value": 1}, {"key": "flag", "value": true}, {"key": "gone", "value": null} ]"#,
    )
    .unwrap();

    assert_eq!(vars["x"], "1");
    assert_eq!(vars["flag"], "true");
    assert!(!vars.contains_key("gone"));
  }

  #[test]
  fn test_parse_blank_body() {
    assert!(parse_variables(URL, "").unwrap().is_empty());
    assert!(parse_variables(URL, "  \n").unwrap().is_empty());
    assert!(parse_variables(URL, "[]").unwrap().is_empty());
  }

  #[test]
  fn test_parse_rejects_object_payload() {
    let result = parse_variables(URL, r#"{"x": "1"}"#);
    assert!(matches!(result, Err(ProviderError::Decode { .. })));
  }

  #[tokio::test]
  async fn test_no_url_returns_empty() {
    let provider =
      RemoteConfigProvider::new(&RemoteVariablesSettings::default(), &HttpSettings::default())
        .unwrap();

    let vars = provider.get_variables().await.unwrap();
    assert!(vars.is_empty());
  }
}
