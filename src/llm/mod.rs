//! Model-backed services for the composer.
//!
//! This module provides:
//! * [`CorrectionService`]: raw correction request boundary (may fail).
//! * [`TextCorrector`]: never-failing correction capability the dictation
//!   session consumes.
//! * [`ApiCorrector`]: OpenAI-compatible REST correction backend.
//! * [`RateLimitedCorrector`]: min-interval gate, bounded backoff on HTTP 429,
//!   raw-text fallback on every other failure.
//! * [`PassthroughCorrector`]: identity, used when correction is disabled.
//! * [`ChatClient`] / [`LlmError`]: shared chat-completions plumbing.
//! * [`PromptBuilder`]: correction, writing and prompt-improvement prompts.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use dictation_composer::config::AppConfig;
//! use dictation_composer::llm::{ApiCorrector, RateLimitedCorrector, TextCorrector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let corrector = RateLimitedCorrector::new(
//!         ApiCorrector::from_config(&config.correction, &config.dictation.language),
//!         &config.correction,
//!     );
//!
//!     // Never fails: falls back to the input on any problem.
//!     let corrected = corrector.correct("ola, como estas").await;
//!     println!("{corrected}");
//! }
//! ```

pub mod client;
pub mod corrector;
pub mod prompt;
pub mod rate_limited;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{ChatClient, LlmError};
pub use corrector::{ApiCorrector, CorrectionService, PassthroughCorrector, TextCorrector};
pub use prompt::PromptBuilder;
pub use rate_limited::{CorrectionThrottle, RateLimitedCorrector};
