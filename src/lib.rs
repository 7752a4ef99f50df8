//! Dictation composer core.
//!
//! Speech recognition feeds a [`dictation::DictationSession`], transcripts
//! are corrected through a rate-limited [`llm::TextCorrector`], and the
//! result is inserted at the cursor of an [`editor::Surface`] by the
//! [`editor::CursorInsertionEngine`].  [`composer::Composer`] ties these
//! together with prompt-driven text and image generation.

pub mod composer;
pub mod config;
pub mod dictation;
pub mod editor;
pub mod generate;
pub mod llm;
pub mod notify;
