//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every struct is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// CorrectionConfig
// ---------------------------------------------------------------------------

/// Settings for the transcript correction step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Whether correction is active at all.  When `false` transcripts are
    /// delivered exactly as recognised.
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible endpoint (without `/v1/...`).
    pub base_url: String,
    /// API key; `None` (or empty) sends no `Authorization` header.
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    /// Minimum gap between successful corrections; calls inside the gap pass
    /// the text through untouched.
    pub min_interval_ms: u64,
    /// Retries after a rate-limited response before giving up.
    pub max_retries: u32,
    /// Backoff base: retry `n` waits `backoff_base_secs ^ n` seconds.
    pub backoff_base_secs: u64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.x.ai".into(),
            api_key: None,
            model: "grok-2-1212".into(),
            temperature: 0.3,
            timeout_secs: 15,
            min_interval_ms: 5_000,
            max_retries: 3,
            backoff_base_secs: 5,
        }
    }
}

impl CorrectionConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// DictationConfig
// ---------------------------------------------------------------------------

/// Speech recognition and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictationConfig {
    /// BCP-47 language tag handed to the recognizer.
    pub language: String,
    /// Keep recognising after the first final result.
    pub continuous: bool,
    /// Report partial (interim) results as they arrive.
    pub interim_results: bool,
    /// Quiet period after the last result before the session stops itself.
    ///
    /// Independent of [`CorrectionConfig::min_interval_ms`]; both merely
    /// default to five seconds.
    pub silence_timeout_ms: u64,
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            language: "es-ES".into(),
            continuous: true,
            interim_results: true,
            silence_timeout_ms: 5_000,
        }
    }
}

impl DictationConfig {
    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Prompt-driven text generation.  Endpoint, key and model fall back to the
/// correction settings when left unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Sampling temperature; `None` uses 0.7.
    pub temperature: Option<f32>,
}

// ---------------------------------------------------------------------------
// ImageConfig
// ---------------------------------------------------------------------------

/// Image generation endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.together.xyz".into(),
            api_key: None,
            model: "black-forest-labs/FLUX.1-schnell-Free".into(),
            width: 512,
            height: 512,
            steps: 1,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// EditorConfig
// ---------------------------------------------------------------------------

/// Editing-surface presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Inline images are constrained to this share of the surface width.
    pub image_max_width_percent: u8,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            image_max_width_percent: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use dictation_composer::config::AppConfig;
///
/// // Load (returns Default when the file is missing)
/// let config = AppConfig::load().unwrap();
/// assert!(config.dictation.silence_timeout_ms > 0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub correction: CorrectionConfig,
    pub dictation: DictationConfig,
    pub generation: GenerationConfig,
    pub image: ImageConfig,
    pub editor: EditorConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
