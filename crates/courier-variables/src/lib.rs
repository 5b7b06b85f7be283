//! Externally supplied variables.
//!
//! Jobs see a layer of centrally managed values beneath their own headers and
//! variables. [`VariablesProvider`] is the seam; two implementations exist:
//!
//! - [`RemoteConfigProvider`] fetches `[{"key": .., "value": ..}]` from a URL,
//!   caches it for the reload interval and, when configured, authorizes with a
//!   client-credentials M2M token that is refreshed on 401/403.
//! - [`EnvVariablesProvider`] selects prefixed variables from the local environment.
//!
//! [`from_config`] picks one the same way the worker bootstrap does.

mod env;
mod error;
mod provider;
mod remote;
mod token;

pub use env::EnvVariablesProvider;
pub use error::ProviderError;
pub use provider::{Variables, VariablesProvider, from_config};
pub use remote::RemoteConfigProvider;
