// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Endpoint, FetchConfig};

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &FetchConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Issue one request for `endpoint` and decode the body.
///
/// Bodies that are not JSON come back as a JSON string value. Timeouts,
/// connection failures, and non-2xx statuses are `AppError::Fetch`.
pub async fn fetch_payload(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<Value> {
    let method = Method::from_bytes(endpoint.method.to_uppercase().as_bytes())
        .map_err(|e| AppError::fetch(&endpoint.url, e))?;

    let mut request = client.request(method, &endpoint.url).timeout(timeout);
    for (key, value) in &endpoint.headers {
        request = request.header(key, value);
    }

    let response = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AppError::fetch(&endpoint.url, e))?;

    let text = response
        .text()
        .await
        .map_err(|e| AppError::fetch(&endpoint.url, e))?;

    Ok(decode_body(text))
}

fn decode_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}
