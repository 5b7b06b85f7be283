use thiserror::Error;

/// Errors that can occur while loading external variables.
///
/// All of these abort the job that triggered the load. The cache and token
/// keep their last known good state.
#[derive(Debug, Error)]
pub enum ProviderError {
  /// The HTTP client could not be constructed.
  #[error("failed to build http client: {source}")]
  Client {
    #[source]
    source: reqwest::Error,
  },

  /// The variables endpoint could not be reached.
  #[error("could not load variables from '{url}': {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The variables endpoint answered with something other than 200.
  #[error("could not load variables from '{url}': status {status}: {body}")]
  Status {
    url: String,
    status: u16,
    body: String,
  },

  /// The variables payload was not a list of key/value records.
  #[error("could not load variables from '{url}': {message}")]
  Decode { url: String, message: String },

  /// No M2M token could be obtained.
  #[error("could not obtain m2m token from '{url}': {message}")]
  Token { url: String, message: String },
}

impl ProviderError {
  pub(crate) fn token(url: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Token {
      url: url.into(),
      message: message.into(),
    }
  }
}
