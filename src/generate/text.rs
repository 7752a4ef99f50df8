//! Prompt-driven text generation and prompt improvement.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{CorrectionConfig, GenerationConfig};
use crate::llm::{ChatClient, LlmError, PromptBuilder};

const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Text generation boundary.  Unlike correction, failures are reported to
/// the caller.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    /// Write new content for `prompt`.  Paragraphs are separated by blank
    /// lines.
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;

    /// Rewrite `prompt` into a clearer one.
    async fn improve_prompt(&self, prompt: &str) -> Result<String, LlmError>;
}

/// [`TextGeneration`] over an OpenAI-compatible chat endpoint.
pub struct ContentGenerator {
    chat: ChatClient,
    prompt_builder: PromptBuilder,
}

impl ContentGenerator {
    /// Unset generation fields fall back to the correction endpoint, key and
    /// model.
    pub fn from_config(
        generation: &GenerationConfig,
        correction: &CorrectionConfig,
        language: &str,
    ) -> Self {
        let base_url = generation
            .base_url
            .as_deref()
            .unwrap_or(&correction.base_url);
        let api_key = generation
            .api_key
            .as_deref()
            .or(correction.api_key.as_deref());
        let model = generation.model.as_deref().unwrap_or(&correction.model);
        let temperature = generation.temperature.unwrap_or(DEFAULT_TEMPERATURE);

        let chat = ChatClient::new(
            base_url,
            api_key,
            model,
            temperature,
            Duration::from_secs(correction.timeout_secs.max(30)),
        );

        Self {
            chat,
            prompt_builder: PromptBuilder::new(language),
        }
    }

    pub fn chat(&self) -> &ChatClient {
        &self.chat
    }
}

#[async_trait]
impl TextGeneration for ContentGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        let (system_msg, user_msg) = self.prompt_builder.generation_chat(prompt);
        log::debug!("generate: requesting text from {}", self.chat.model());
        self.chat.complete(&system_msg, &user_msg).await
    }

    async fn improve_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        let (system_msg, user_msg) = self.prompt_builder.improvement_chat(prompt);
        self.chat.complete(&system_msg, &user_msg).await
    }
}
