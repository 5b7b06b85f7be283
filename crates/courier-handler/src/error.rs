use courier_template::TemplateError;
use courier_variables::ProviderError;
use thiserror::Error;

/// Errors that prevent a job from producing an outcome.
///
/// HTTP-level failures are not errors: they are classified into a
/// [`crate::JobOutcome`]. These variants cover everything that stops the
/// handler before a response can be classified.
#[derive(Debug, Error)]
pub enum HandlerError {
  /// A required parameter is absent from every configuration source.
  #[error("missing required parameter: {name}")]
  MissingParameter { name: &'static str },

  /// A parameter resolved to a value that cannot be used.
  #[error("invalid parameter '{name}': {message}")]
  InvalidParameter { name: &'static str, message: String },

  /// Placeholder expansion failed for a parameter.
  #[error("failed to expand parameter '{name}': {source}")]
  Template {
    name: &'static str,
    #[source]
    source: TemplateError,
  },

  /// External variables could not be loaded.
  #[error("failed to load variables: {source}")]
  Variables {
    #[source]
    source: ProviderError,
  },

  /// The HTTP client could not be constructed.
  #[error("failed to build http client: {source}")]
  Client {
    #[source]
    source: reqwest::Error,
  },

  /// The outbound call did not finish within the configured timeouts.
  #[error("request to '{url}' timed out")]
  Timeout { url: String },

  /// The outbound call failed below the HTTP layer.
  #[error("request to '{url}' failed: {source}")]
  Transport {
    url: String,
    #[source]
    source: reqwest::Error,
  },
}

impl HandlerError {
  pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
    Self::InvalidParameter {
      name,
      message: message.into(),
    }
  }

  pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
    if source.is_timeout() {
      Self::Timeout {
        url: url.to_string(),
      }
    } else {
      Self::Transport {
        url: url.to_string(),
        source,
      }
    }
  }

  /// Whether the broker should redeliver the job.
  ///
  /// Configuration defects fail the same way on every attempt and are not retried.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Variables { .. } | Self::Timeout { .. } | Self::Transport { .. } => true,
      Self::MissingParameter { .. }
      | Self::InvalidParameter { .. }
      | Self::Template { .. }
      | Self::Client { .. } => false,
    }
  }
}
