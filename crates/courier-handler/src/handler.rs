use std::sync::Arc;

use courier_config::HttpSettings;
use courier_job::Job;
use courier_overlay::Overlay;
use courier_template::PlaceholderEngine;
use courier_variables::VariablesProvider;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, redirect};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::HandlerError;
use crate::extract::extract;
use crate::outcome::JobOutcome;
use crate::request::ResolvedRequest;
use crate::status::{DEFAULT_COMPLETION_PATTERN, DEFAULT_FAILURE_PATTERN, StatusCodePattern};

const PARAM_STATUS_CODE_COMPLETION: &str = "statusCodeCompletion";
const PARAM_STATUS_CODE_FAILURE: &str = "statusCodeFailure";
const PARAM_ERROR_CODE_PATH: &str = "errorCodePath";
const PARAM_ERROR_MESSAGE_PATH: &str = "errorMessagePath";

/// The response of a dispatched request, read in full.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: String,
}

/// Handles HTTP jobs: resolves the request from the job's overlay, sends it and
/// classifies the response.
///
/// Holds no per-job state, so one handler serves any number of concurrent jobs.
pub struct HttpJobHandler {
  client: Client,
  variables: Arc<dyn VariablesProvider>,
  templates: PlaceholderEngine,
}

impl HttpJobHandler {
  pub fn new(
    settings: &HttpSettings,
    variables: Arc<dyn VariablesProvider>,
  ) -> Result<Self, HandlerError> {
    // Redirects are classified like any other status.
    let client = Client::builder()
      .connect_timeout(settings.connect_timeout())
      .timeout(settings.response_timeout())
      .redirect(redirect::Policy::none())
      .build()
      .map_err(|source| HandlerError::Client { source })?;

    Ok(Self::with_client(client, variables))
  }

  pub fn with_client(client: Client, variables: Arc<dyn VariablesProvider>) -> Self {
    Self {
      client,
      variables,
      templates: PlaceholderEngine::new(),
    }
  }

  /// Handle one job and compute its outcome.
  ///
  /// HTTP failures are outcomes, not errors. An `Err` means the request could
  /// not be resolved or did not produce a response.
  #[instrument(skip_all, fields(job_key = job.key, retries = job.retries))]
  pub async fn handle(&self, job: &Job) -> Result<JobOutcome, HandlerError> {
    let external = self
      .variables
      .variables()
      .await
      .map_err(|source| HandlerError::Variables { source })?;

    let overlay = Overlay::new(job, &external);
    let request = ResolvedRequest::resolve(&overlay, &self.templates)?;
    let response = self.dispatch(&request).await?;

    Ok(classify(&overlay, &request, &response, job.retries))
  }

  async fn dispatch(&self, request: &ResolvedRequest) -> Result<HttpResponse, HandlerError> {
    debug!(method = %request.method, url = %request.url, "dispatching request");

    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone())
      .header(CONTENT_TYPE, request.content_type.clone())
      .header(ACCEPT, request.accept.clone());

    if let Some(authorization) = &request.authorization {
      builder = builder.header(AUTHORIZATION, authorization.clone());
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let url = request.url.as_str();
    let response = builder
      .send()
      .await
      .map_err(|e| HandlerError::from_reqwest(url, e))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    let body = response
      .text()
      .await
      .map_err(|e| HandlerError::from_reqwest(url, e))?;

    debug!(status, "response received");

    Ok(HttpResponse {
      status,
      content_type,
      body,
    })
  }
}

/// Map a response to an outcome using the job's status code patterns.
///
/// Failure patterns are checked first. A status matching neither pattern
/// leaves the job pending.
pub fn classify(
  overlay: &Overlay,
  request: &ResolvedRequest,
  response: &HttpResponse,
  retries: u32,
) -> JobOutcome {
  let failure = pattern(overlay, PARAM_STATUS_CODE_FAILURE, DEFAULT_FAILURE_PATTERN);
  let completion = pattern(overlay, PARAM_STATUS_CODE_COMPLETION, DEFAULT_COMPLETION_PATTERN);

  if failure.matches(response.status) {
    failed(overlay, response, retries)
  } else if completion.matches(response.status) {
    completed(request, response)
  } else {
    JobOutcome::Pending
  }
}

fn pattern(overlay: &Overlay, name: &str, default: &str) -> StatusCodePattern {
  StatusCodePattern::parse(
    overlay
      .get_string_ignore_case(name)
      .as_deref()
      .unwrap_or(default),
  )
}

fn failed(overlay: &Overlay, response: &HttpResponse, retries: u32) -> JobOutcome {
  let body = serde_json::from_str::<Value>(&response.body).ok();
  let code_path = overlay.get_string_ignore_case(PARAM_ERROR_CODE_PATH);
  let message_path = overlay.get_string_ignore_case(PARAM_ERROR_MESSAGE_PATH);

  let error_code = extract(body.as_ref(), code_path.as_deref());
  let message = extract(body.as_ref(), message_path.as_deref()).unwrap_or_else(|| {
    format!(
      "request failed with {}: {}",
      response.status, response.body
    )
  });

  match error_code {
    Some(error_code) => JobOutcome::ThrowError {
      error_code,
      message,
    },
    None => JobOutcome::Fail {
      retries: retries.saturating_sub(1),
      message,
    },
  }
}

fn completed(request: &ResolvedRequest, response: &HttpResponse) -> JobOutcome {
  let mut variables = Map::new();
  variables.insert("statusCode".to_string(), Value::from(response.status));

  if !response.body.is_empty() {
    if request.accepts_plain_text() && is_plain_text(response.content_type.as_deref()) {
      variables.insert("body".to_string(), Value::String(response.body.clone()));
    } else {
      match serde_json::from_str::<Value>(&response.body) {
        Ok(body) => {
          variables.insert("body".to_string(), body);
        }
        Err(e) => warn!(error = %e, "response body is not json, omitting it"),
      }
    }
  }

  JobOutcome::Complete { variables }
}

fn is_plain_text(content_type: Option<&str>) -> bool {
  content_type.is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/plain"))
}
