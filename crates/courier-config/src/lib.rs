//! Courier Config
//!
//! This crate contains the worker configuration types for courier. They describe
//! how outbound calls are bounded in time and where the externally supplied
//! variables come from (a remote endpoint, optionally behind an M2M token, or the
//! local process environment).
//!
//! Configuration can be loaded from:
//! - built-in defaults
//! - a JSON file (via CLI with `--config=courier.json`)
//! - environment variables, applied last via [`WorkerConfig::apply_env`]

mod env;
mod error;
mod worker;

pub use error::ConfigError;
pub use worker::{
  DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_LOCAL_PREFIX, DEFAULT_RELOAD_INTERVAL_MS,
  DEFAULT_RESPONSE_TIMEOUT_MS, HttpSettings, LocalVariablesSettings, M2mSettings,
  RemoteVariablesSettings, WorkerConfig,
};
