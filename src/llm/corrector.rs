//! Correction traits and the HTTP-backed [`ApiCorrector`].
//!
//! Two layers:
//! * [`CorrectionService`] is the raw request/response boundary.  It can fail
//!   and it can report rate limiting.
//! * [`TextCorrector`] is what the dictation session consumes.  It never
//!   fails: any problem degrades to returning the input unchanged.
//!
//! [`RateLimitedCorrector`](crate::llm::RateLimitedCorrector) turns the first
//! into the second.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::CorrectionConfig;
use crate::llm::client::{ChatClient, LlmError};
use crate::llm::prompt::PromptBuilder;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One correction request against an external service.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. held behind an `Arc`).
#[async_trait]
pub trait CorrectionService: Send + Sync {
    /// Return the corrected form of `text`.
    ///
    /// Must return [`LlmError::RateLimited`] when the service throttles the
    /// caller; every other error is treated as a transient failure.
    async fn request_correction(&self, text: &str) -> Result<String, LlmError>;
}

/// Best-effort transcript correction.  Never fails.
#[async_trait]
pub trait TextCorrector: Send + Sync {
    async fn correct(&self, text: &str) -> String;
}

// ---------------------------------------------------------------------------
// ApiCorrector
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with the
/// correction prompt for the configured dictation language.
///
/// All connection details come from [`CorrectionConfig`]; nothing is
/// hardcoded.
pub struct ApiCorrector {
    chat: ChatClient,
    prompt_builder: PromptBuilder,
}

impl ApiCorrector {
    /// Build an `ApiCorrector` from the correction settings and the language
    /// the recognizer is dictating in.
    pub fn from_config(config: &CorrectionConfig, language: &str) -> Self {
        let chat = ChatClient::new(
            &config.base_url,
            config.api_key.as_deref(),
            &config.model,
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        );

        Self {
            chat,
            prompt_builder: PromptBuilder::new(language),
        }
    }
}

#[async_trait]
impl CorrectionService for ApiCorrector {
    async fn request_correction(&self, text: &str) -> Result<String, LlmError> {
        let (system_msg, user_msg) = self.prompt_builder.correction_chat(text);
        self.chat.complete(&system_msg, &user_msg).await
    }
}

// ---------------------------------------------------------------------------
// PassthroughCorrector
// ---------------------------------------------------------------------------

/// Identity corrector used when correction is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCorrector;

#[async_trait]
impl TextCorrector for PassthroughCorrector {
    async fn correct(&self, text: &str) -> String {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
