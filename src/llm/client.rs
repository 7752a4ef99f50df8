//! Minimal OpenAI-compatible chat-completions client and the shared
//! [`LlmError`] type.
//!
//! Both the transcript corrector and the content generator speak the same
//! `/v1/chat/completions` wire format; [`ChatClient`] owns the HTTP details so
//! neither of them has to.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to a model endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The service asked us to slow down (HTTP 429).
    #[error("rate limited by the service")]
    RateLimited,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Any non-2xx status other than 429.
    #[error("service returned HTTP {0}")]
    Status(u16),

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The response carried no usable content.
    #[error("service returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// Map a non-success HTTP status onto the matching variant.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            LlmError::RateLimited
        } else {
            LlmError::Status(status.as_u16())
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// One configured chat-completions endpoint.
///
/// The `Authorization: Bearer …` header is attached only when `api_key` is a
/// non-empty string, so local providers without authentication work as-is.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl ChatClient {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            model: model.to_string(),
            temperature,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// JSON body for one non-streaming completion.
    pub fn request_body(&self, system_msg: &str, user_msg: &str) -> serde_json::Value {
        serde_json::json!({
            "model":       self.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream":      false,
            "temperature": self.temperature
        })
    }

    /// Send one completion request and return the trimmed reply text.
    pub async fn complete(&self, system_msg: &str, user_msg: &str) -> Result<String, LlmError> {
        let mut req = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(system_msg, user_msg));

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::from_status(status));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        extract_message_content(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
pub fn extract_message_content(json: &serde_json::Value) -> Result<String, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(LlmError::EmptyResponse)?
        .trim();

    if content.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
