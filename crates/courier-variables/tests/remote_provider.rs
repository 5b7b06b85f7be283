//! Integration tests for RemoteConfigProvider against a mock HTTP server.

use std::sync::Arc;

use courier_config::{HttpSettings, M2mSettings, RemoteVariablesSettings};
use courier_variables::{ProviderError, RemoteConfigProvider, VariablesProvider};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "Bearer TOKEN_123_42";

fn settings(server: &MockServer, reload_interval_ms: u64, m2m: bool) -> RemoteVariablesSettings {
  RemoteVariablesSettings {
    url: Some(format!("{}/config", server.uri())),
    reload_interval_ms,
    m2m: m2m.then(|| M2mSettings {
      base_url: format!("{}/token", server.uri()),
      client_id: "someClientId".to_string(),
      client_secret: "someSecret".to_string(),
      audience: "someAudience".to_string(),
    }),
  }
}

fn provider(settings: &RemoteVariablesSettings) -> RemoteConfigProvider {
  RemoteConfigProvider::new(settings, &HttpSettings::default()).expect("failed to build provider")
}

fn variables_body() -> serde_json::Value {
  json!([ { "key": "x", "value": 1 }, { "key": "y", "value": "2" } ])
}

async fn mount_token(server: &MockServer) {
  Mock::given(method("POST"))
    .and(path("/token"))
    .and(header("Accept", "application/json"))
    .and(header("Content-Type", "application/json"))
    .and(body_json(json!({
      "client_id": "someClientId",
      "client_secret": "someSecret",
      "audience": "someAudience",
      "grant_type": "client_credentials"
    })))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({ "token_type": "Bearer", "access_token": "TOKEN_123_42" })),
    )
    .mount(server)
    .await;
}

async fn count_requests(server: &MockServer, verb: &str, route: &str) -> usize {
  server
    .received_requests()
    .await
    .unwrap_or_default()
    .iter()
    .filter(|r| r.method.as_str() == verb && r.url.path() == route)
    .count()
}

#[tokio::test]
async fn test_fetch_without_m2m() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .and(header("Accept", "application/json"))
    .respond_with(ResponseTemplate::new(200).set_body_json(variables_body()))
    .expect(1)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 60_000, false));
  let vars = provider.get_variables().await.unwrap();

  assert_eq!(vars["x"], "1");
  assert_eq!(vars["y"], "2");

  let requests = server.received_requests().await.unwrap();
  assert!(requests[0].headers.get("Authorization").is_none());
}

#[tokio::test]
async fn test_cached_within_reload_interval() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(200).set_body_json(variables_body()))
    .expect(1)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 60_000, false));
  let first = provider.get_variables().await.unwrap();
  let second = provider.get_variables().await.unwrap();

  assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_refetched_after_reload_interval() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(200).set_body_json(variables_body()))
    .expect(2)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, false));
  provider.get_variables().await.unwrap();
  provider.get_variables().await.unwrap();
}

#[tokio::test]
async fn test_blank_body_is_empty() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(200))
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, false));
  let vars = provider.get_variables().await.unwrap();

  assert!(vars.is_empty());
}

#[tokio::test]
async fn test_m2m_token_attached_and_reused() {
  let server = MockServer::start().await;
  mount_token(&server).await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .and(header("Authorization", TOKEN))
    .respond_with(ResponseTemplate::new(200).set_body_json(variables_body()))
    .expect(2)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, true));
  provider.get_variables().await.unwrap();
  provider.get_variables().await.unwrap();

  assert_eq!(count_requests(&server, "POST", "/token").await, 1);
}

#[tokio::test]
async fn test_token_refreshed_once_on_forbidden() {
  let server = MockServer::start().await;
  mount_token(&server).await;

  // Seed the provider with a cached token.
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
    .up_to_n_times(1)
    .with_priority(1)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, true));
  assert!(provider.get_variables().await.unwrap().is_empty());

  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(403))
    .up_to_n_times(1)
    .with_priority(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .and(header("Authorization", TOKEN))
    .respond_with(ResponseTemplate::new(200).set_body_json(variables_body()))
    .with_priority(2)
    .mount(&server)
    .await;

  let posts_before = count_requests(&server, "POST", "/token").await;
  let gets_before = count_requests(&server, "GET", "/config").await;

  let vars = provider.get_variables().await.unwrap();

  assert_eq!(vars["x"], "1");
  assert_eq!(count_requests(&server, "POST", "/token").await - posts_before, 1);
  assert_eq!(count_requests(&server, "GET", "/config").await - gets_before, 2);
}

#[tokio::test]
async fn test_second_unauthorized_is_not_retried() {
  let server = MockServer::start().await;
  mount_token(&server).await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(401))
    .expect(2)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, true));
  let result = provider.get_variables().await;

  match result {
    Err(ProviderError::Status { status, .. }) => assert_eq!(status, 401),
    other => panic!("expected status error, got {:?}", other),
  }
  // One acquisition up front, one after the first 401.
  assert_eq!(count_requests(&server, "POST", "/token").await, 2);
}

#[tokio::test]
async fn test_non_ok_status_fails() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
    .expect(1)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, false));
  let result = provider.get_variables().await;

  match result {
    Err(ProviderError::Status { status, body, .. }) => {
      assert_eq!(status, 500);
      assert_eq!(body, "boom");
    }
    other => panic!("expected status error, got {:?}", other),
  }
}

#[tokio::test]
async fn test_token_kept_after_server_error() {
  let server = MockServer::start().await;
  mount_token(&server).await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(503))
    .up_to_n_times(1)
    .with_priority(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(200).set_body_json(variables_body()))
    .with_priority(2)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, true));
  assert!(provider.get_variables().await.is_err());
  assert_eq!(provider.get_variables().await.unwrap()["y"], "2");

  assert_eq!(count_requests(&server, "POST", "/token").await, 1);
}

#[tokio::test]
async fn test_token_endpoint_failure() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/token"))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(ResponseTemplate::new(200).set_body_json(variables_body()))
    .expect(0)
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, true));
  let result = provider.get_variables().await;

  assert!(matches!(result, Err(ProviderError::Token { .. })));
}

#[tokio::test]
async fn test_token_response_missing_fields() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/token"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "abc" })))
    .mount(&server)
    .await;

  let provider = provider(&settings(&server, 0, true));
  let result = provider.get_variables().await;

  assert!(matches!(result, Err(ProviderError::Token { .. })));
}

#[tokio::test]
async fn test_concurrent_stale_reads_fetch_once() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/config"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(variables_body())
        .set_delay(std::time::Duration::from_millis(50)),
    )
    .expect(1)
    .mount(&server)
    .await;

  let provider = Arc::new(provider(&settings(&server, 60_000, false)));

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let provider = provider.clone();
      tokio::spawn(async move { provider.variables().await })
    })
    .collect();

  for handle in handles {
    let vars = handle.await.unwrap().unwrap();
    assert_eq!(vars["x"], "1");
  }
}
