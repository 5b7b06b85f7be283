//! Client-credentials token exchange.

use courier_config::M2mSettings;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ProviderError;

#[derive(Serialize)]
struct TokenRequest<'a> {
  client_id: &'a str,
  client_secret: &'a str,
  audience: &'a str,
  grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
  token_type: String,
  access_token: String,
}

/// Obtain a fresh token and return it as an `Authorization` header value.
pub(crate) async fn acquire(client: &Client, m2m: &M2mSettings) -> Result<String, ProviderError> {
  let request = TokenRequest {
    client_id: &m2m.client_id,
    client_secret: &m2m.client_secret,
    audience: &m2m.audience,
    grant_type: "client_credentials",
  };

  let response = client
    .post(&m2m.base_url)
    .header(ACCEPT, "application/json")
    .json(&request)
    .send()
    .await
    .map_err(|e| ProviderError::token(&m2m.base_url, e.to_string()))?;

  let status = response.status();
  if !status.is_success() {
    return Err(ProviderError::token(
      &m2m.base_url,
      format!("token endpoint returned status {}", status.as_u16()),
    ));
  }

  let token: TokenResponse = response
    .json()
    .await
    .map_err(|e| ProviderError::token(&m2m.base_url, format!("invalid token response: {}", e)))?;

  info!(
    url = %m2m.base_url,
    token_type = %token.token_type,
    "m2m_token_refreshed"
  );

  Ok(format!("{} {}", token.token_type, token.access_token))
}
