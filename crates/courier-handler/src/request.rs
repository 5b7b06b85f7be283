use courier_overlay::Overlay;
use courier_template::PlaceholderEngine;
use reqwest::Method;
use reqwest::header::HeaderValue;
use serde_json::Value;
use url::Url;

use crate::error::HandlerError;

pub(crate) const PARAM_URL: &str = "url";
pub(crate) const PARAM_METHOD: &str = "method";
pub(crate) const PARAM_BODY: &str = "body";
pub(crate) const PARAM_AUTHORIZATION: &str = "authorization";
pub(crate) const PARAM_CONTENT_TYPE: &str = "contentType";
pub(crate) const PARAM_ACCEPT: &str = "accept";

const APPLICATION_JSON: &str = "application/json";

/// The outbound call described by one job, after placeholder expansion.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
  pub url: Url,
  pub method: Method,
  pub body: Option<String>,
  pub authorization: Option<HeaderValue>,
  pub content_type: HeaderValue,
  pub accept: HeaderValue,
}

impl ResolvedRequest {
  /// Resolve every request parameter from the overlay.
  ///
  /// Fails only on configuration defects: a missing or unusable `url`, an
  /// invalid method or header value, or a template that fails to render.
  pub fn resolve(overlay: &Overlay, templates: &PlaceholderEngine) -> Result<Self, HandlerError> {
    let url = expand(overlay, templates, PARAM_URL)?
      .ok_or(HandlerError::MissingParameter { name: PARAM_URL })?;
    let url = Url::parse(url.trim()).map_err(|e| HandlerError::invalid(PARAM_URL, e.to_string()))?;

    let method = match expand(overlay, templates, PARAM_METHOD)? {
      Some(method) => Method::from_bytes(method.trim().to_uppercase().as_bytes())
        .map_err(|e| HandlerError::invalid(PARAM_METHOD, e.to_string()))?,
      None => Method::GET,
    };

    let body = match overlay.get(PARAM_BODY) {
      None | Some(Value::Null) => None,
      Some(Value::String(template)) => Some(
        templates
          .expand_str(template, overlay.context())
          .map_err(|source| HandlerError::Template {
            name: PARAM_BODY,
            source,
          })?,
      ),
      // Structured bodies are sent as JSON without expansion.
      Some(other) => Some(other.to_string()),
    };

    let authorization = expand(overlay, templates, PARAM_AUTHORIZATION)?
      .map(|value| header_value(PARAM_AUTHORIZATION, value))
      .transpose()?;

    let content_type = header_value(
      PARAM_CONTENT_TYPE,
      expand(overlay, templates, PARAM_CONTENT_TYPE)?.unwrap_or_else(|| APPLICATION_JSON.to_string()),
    )?;
    let accept = header_value(
      PARAM_ACCEPT,
      expand(overlay, templates, PARAM_ACCEPT)?.unwrap_or_else(|| APPLICATION_JSON.to_string()),
    )?;

    Ok(Self {
      url,
      method,
      body,
      authorization,
      content_type,
      accept,
    })
  }

  /// Whether the caller asked for a plain text response.
  pub(crate) fn accepts_plain_text(&self) -> bool {
    self
      .accept
      .to_str()
      .is_ok_and(|accept| accept.to_ascii_lowercase().contains("text/plain"))
  }
}

/// Look up a parameter case-insensitively and expand it. Blank results count as absent.
fn expand(
  overlay: &Overlay,
  templates: &PlaceholderEngine,
  name: &'static str,
) -> Result<Option<String>, HandlerError> {
  let expanded = templates
    .expand(overlay.get_string_ignore_case(name).as_deref(), overlay.context())
    .map_err(|source| HandlerError::Template { name, source })?;

  Ok(expanded.filter(|value| !value.trim().is_empty()))
}

fn header_value(name: &'static str, value: String) -> Result<HeaderValue, HandlerError> {
  HeaderValue::try_from(value).map_err(|e| HandlerError::invalid(name, e.to_string()))
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use courier_job::Job;
  use serde_json::json;

  use super::*;

  fn resolve(job: &Job) -> Result<ResolvedRequest, HandlerError> {
    resolve_with(job, &HashMap::new())
  }

  fn resolve_with(job: &Job, external: &HashMap<String, String>) -> Result<ResolvedRequest, HandlerError> {
    let overlay = Overlay::new(job, external);
    ResolvedRequest::resolve(&overlay, &PlaceholderEngine::new())
  }

  #[test]
  fn test_defaults() {
    let job = Job::new(1).with_header("url", "http://localhost/api");
    let request = resolve(&job).unwrap();

    assert_eq!(request.url.as_str(), "http://localhost/api");
    assert_eq!(request.method, Method::GET);
    assert!(request.body.is_none());
    assert!(request.authorization.is_none());
    assert_eq!(request.content_type, APPLICATION_JSON);
    assert_eq!(request.accept, APPLICATION_JSON);
  }

  #[test]
  fn test_missing_url() {
    let job = Job::new(1).with_header("method", "POST");
    let result = resolve(&job);

    assert!(matches!(result, Err(HandlerError::MissingParameter { name: "url" })));
  }

  #[test]
  fn test_url_expanding_to_blank_is_missing() {
    let job = Job::new(1).with_header("url", "{{ nothing }}");
    let result = resolve(&job);

    assert!(matches!(result, Err(HandlerError::MissingParameter { .. })));
  }

  #[test]
  fn test_unparseable_url() {
    let job = Job::new(1).with_header("url", "not a url");
    let result = resolve(&job);

    assert!(matches!(result, Err(HandlerError::InvalidParameter { name: "url", .. })));
  }

  #[test]
  fn test_url_expansion_with_both_syntaxes() {
    let job = Job::new(7)
      .with_header("URL", "http://localhost/{{ path }}/${id}?job={{jobKey}}")
      .with_variable("path", json!("orders"));
    let external = HashMap::from([("id".to_string(), "42".to_string())]);

    let request = resolve_with(&job, &external).unwrap();

    assert_eq!(request.url.as_str(), "http://localhost/orders/42?job=7");
  }

  #[test]
  fn test_method_is_uppercased() {
    let job = Job::new(1)
      .with_header("url", "http://localhost")
      .with_header("method", "{{ verb }}")
      .with_variable("verb", json!("patch"));

    assert_eq!(resolve(&job).unwrap().method, Method::PATCH);
  }

  #[test]
  fn test_invalid_method() {
    let job = Job::new(1)
      .with_header("url", "http://localhost")
      .with_header("method", "NOT VALID");

    assert!(matches!(
      resolve(&job),
      Err(HandlerError::InvalidParameter { name: "method", .. })
    ));
  }

  #[test]
  fn test_string_body_is_expanded() {
    let job = Job::new(5)
      .with_header("url", "http://localhost")
      .with_variable("body", json!(r#"{"job": {{ jobKey }}, "name": "${name}"}"#))
      .with_variable("name", json!("x"));

    assert_eq!(
      resolve(&job).unwrap().body.as_deref(),
      Some(r#"{"job": 5, "name": "x"}"#)
    );
  }

  #[test]
  fn test_structured_body_is_serialized_verbatim() {
    let job = Job::new(1)
      .with_header("url", "http://localhost")
      .with_variable("body", json!({ "text": "{{ jobKey }}" }));

    assert_eq!(
      resolve(&job).unwrap().body.as_deref(),
      Some(r#"{"text":"{{ jobKey }}"}"#)
    );
  }

  #[test]
  fn test_null_body_is_absent() {
    let job = Job::new(1)
      .with_header("url", "http://localhost")
      .with_variable("body", Value::Null);

    assert!(resolve(&job).unwrap().body.is_none());
  }

  #[test]
  fn test_headers_resolved() {
    let job = Job::new(1)
      .with_header("url", "http://localhost")
      .with_header("Authorization", "token {{ secret }}")
      .with_header("contentType", "text/plain")
      .with_header("ACCEPT", "text/plain")
      .with_variable("secret", json!(123));

    let request = resolve(&job).unwrap();

    assert_eq!(request.authorization.clone().unwrap(), "token 123");
    assert_eq!(request.content_type, "text/plain");
    assert!(request.accepts_plain_text());
  }

  #[test]
  fn test_jinja_like_text_in_url_is_kept() {
    let job = Job::new(1)
      .with_header("url", "http://localhost/api?filter={%22id%22:{{id}}}")
      .with_variable("id", json!(7));

    let request = resolve(&job).unwrap();

    assert_eq!(request.url.query(), Some("filter={%22id%22:7}"));
  }

  #[test]
  fn test_non_identifier_keys_in_authorization() {
    let job = Job::new(1)
      .with_header("url", "http://localhost")
      .with_header("authorization", "Bearer {{api-key}}")
      .with_variable("api-key", json!("secret"));

    assert_eq!(resolve(&job).unwrap().authorization.unwrap(), "Bearer secret");
  }
}
