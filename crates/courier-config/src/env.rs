//! Environment variable overrides.
//!
//! Variables are passed in explicitly rather than read from the process so
//! callers decide the source (`std::env::vars()` in the binary, a fixed list in tests).

use std::str::FromStr;

use crate::error::ConfigError;
use crate::worker::{M2mSettings, WorkerConfig};

const ENV_VARS_URL: &str = "ENV_VARS_URL";
const ENV_VARS_RELOAD_RATE: &str = "ENV_VARS_RELOAD_RATE";
const ENV_VARS_M2M_BASE_URL: &str = "ENV_VARS_M2M_BASE_URL";
const ENV_VARS_M2M_CLIENT_ID: &str = "ENV_VARS_M2M_CLIENT_ID";
const ENV_VARS_M2M_CLIENT_SECRET: &str = "ENV_VARS_M2M_CLIENT_SECRET";
const ENV_VARS_M2M_AUDIENCE: &str = "ENV_VARS_M2M_AUDIENCE";
const LOCAL_ENV_VARS_PREFIX: &str = "LOCAL_ENV_VARS_PREFIX";
const LOCAL_ENV_VARS_REMOVE_PREFIX: &str = "LOCAL_ENV_VARS_REMOVE_PREFIX";
const HTTP_CONNECT_TIMEOUT_MS: &str = "HTTP_CONNECT_TIMEOUT_MS";
const HTTP_RESPONSE_TIMEOUT_MS: &str = "HTTP_RESPONSE_TIMEOUT_MS";

impl WorkerConfig {
  /// Apply environment overrides on top of this configuration.
  ///
  /// Unknown variables are ignored. Numeric and boolean values must parse.
  pub fn apply_env<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
  {
    for (name, value) in vars {
      let name = name.as_ref();
      let value = value.into();

      match name {
        ENV_VARS_URL => self.remote.url = Some(value),
        ENV_VARS_RELOAD_RATE => self.remote.reload_interval_ms = parse(name, &value)?,
        ENV_VARS_M2M_BASE_URL => self.m2m_mut().base_url = value,
        ENV_VARS_M2M_CLIENT_ID => self.m2m_mut().client_id = value,
        ENV_VARS_M2M_CLIENT_SECRET => self.m2m_mut().client_secret = value,
        ENV_VARS_M2M_AUDIENCE => self.m2m_mut().audience = value,
        LOCAL_ENV_VARS_PREFIX => self.local.prefix = value,
        LOCAL_ENV_VARS_REMOVE_PREFIX => self.local.remove_prefix = parse(name, &value)?,
        HTTP_CONNECT_TIMEOUT_MS => self.http.connect_timeout_ms = parse(name, &value)?,
        HTTP_RESPONSE_TIMEOUT_MS => self.http.response_timeout_ms = parse(name, &value)?,
        _ => {}
      }
    }

    Ok(self)
  }

  fn m2m_mut(&mut self) -> &mut M2mSettings {
    self.remote.m2m.get_or_insert_with(M2mSettings::default)
  }
}

fn parse<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  value
    .trim()
    .parse()
    .map_err(|e: T::Err| ConfigError::invalid_env(name, value, e.to_string()))
}
