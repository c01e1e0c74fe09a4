//! HTTP client for the LLM relay
//!
//! Every provider request goes through one relay endpoint which holds the
//! upstream routing. The body names the target engine and carries the
//! caller's vendor API key.

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

use super::stream::RawResponse;
use crate::agents::config::LlmEngine;
use crate::agents::error::{LlmError, LlmResult};

/// Sends engine-tagged request bodies to the relay
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, auth_token: Option<String>, connect_timeout: Duration) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST a request body; non-success statuses become [`LlmError::Api`]
    pub async fn post(&self, engine: LlmEngine, body: &Value) -> LlmResult<RawResponse> {
        tracing::debug!(engine = %engine, url = %self.url, "Sending request through relay");

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text).unwrap_or_else(|| {
                format!("{} relay failed with status {}", engine.label(), status.as_u16())
            });
            tracing::warn!(engine = %engine, status = status.as_u16(), "Relay request failed: {}", message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(RawResponse::from_http(response))
    }
}

/// Extract `error.message` from a relay or vendor error envelope
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        error => error.get("message").and_then(Value::as_str).map(String::from),
    }
}
