//! Host glue: routes dictated and generated content into the document.
//!
//! A [`Composer`] owns the editable [`Surface`] and a prompt buffer.
//! Dictation output goes to whichever of the two is the current
//! [`DictationTarget`]; generated text and images always go to the surface.

use std::sync::Arc;

use crate::config::ImageConfig;
use crate::dictation::{DictationOutput, SharedDictationState};
use crate::editor::{ContentFragment, CursorInsertionEngine, EditableSurface, ImageRef, Surface};
use crate::generate::{ImageGeneration, ImageRequest, TextGeneration};
use crate::notify::{Notification, Notifier};

/// Where dictated transcripts land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DictationTarget {
    #[default]
    Document,
    Prompt,
}

pub struct Composer {
    surface: Surface,
    engine: CursorInsertionEngine,
    prompt: String,
    target: DictationTarget,
    dictation: SharedDictationState,
    notifier: Arc<dyn Notifier>,
}

impl Composer {
    pub fn new(
        surface: Surface,
        engine: CursorInsertionEngine,
        dictation: SharedDictationState,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            surface,
            engine,
            prompt: String::new(),
            target: DictationTarget::default(),
            dictation,
            notifier,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Serialized document.
    pub fn content(&self) -> String {
        self.surface.serialize()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn clear_prompt(&mut self) {
        self.prompt.clear();
        self.notifier.notify(Notification::info(
            "Prompt cleared",
            "The prompt has been removed.",
        ));
    }

    pub fn target(&self) -> DictationTarget {
        self.target
    }

    pub fn set_target(&mut self, target: DictationTarget) {
        self.target = target;
    }

    /// Listening indicator, read from the session's published state.
    pub fn is_listening(&self) -> bool {
        self.dictation.lock().unwrap().status.is_active()
    }

    // -----------------------------------------------------------------------
    // Dictation
    // -----------------------------------------------------------------------

    /// Apply one session output.  Returns the new serialized document when
    /// the document changed.
    pub fn handle_output(&mut self, output: DictationOutput) -> Option<String> {
        match output {
            DictationOutput::Transcript(text) => match self.target {
                DictationTarget::Document => self.insert_text(&text),
                DictationTarget::Prompt => {
                    self.append_to_prompt(&text);
                    None
                }
            },
            DictationOutput::AutoStopped => {
                log::debug!("composer: dictation stopped after silence");
                None
            }
            DictationOutput::Ended => {
                log::debug!("composer: recognizer ended");
                None
            }
        }
    }

    fn append_to_prompt(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.prompt.is_empty() && !self.prompt.ends_with(char::is_whitespace) {
            self.prompt.push(' ');
        }
        self.prompt.push_str(text);
    }

    // -----------------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------------

    /// Insert `text` at the cursor (or at the end).  `None` when the text
    /// holds no content.
    pub fn insert_text(&mut self, text: &str) -> Option<String> {
        let fragment = ContentFragment::from_text(text);
        if fragment.is_empty() {
            return None;
        }
        Some(self.engine.insert(&mut self.surface, &fragment))
    }

    pub fn insert_image(&mut self, image: ImageRef) -> String {
        self.engine.insert(&mut self.surface, &ContentFragment::image(image))
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Generate text from the current prompt and insert it.
    pub async fn generate_text(&mut self, generator: &dyn TextGeneration) -> Option<String> {
        let prompt = self.prompt_or_notify()?;
        match generator.generate_text(&prompt).await {
            Ok(text) => self.insert_text(&text),
            Err(e) => {
                log::warn!("composer: text generation failed: {e}");
                self.notifier.notify(Notification::error(
                    "Error",
                    "Could not generate the text. Please try again.",
                ));
                None
            }
        }
    }

    /// Replace the prompt with an improved version.  Returns the new prompt.
    pub async fn improve_prompt(&mut self, generator: &dyn TextGeneration) -> Option<String> {
        let prompt = self.prompt_or_notify()?;
        match generator.improve_prompt(&prompt).await {
            Ok(improved) => {
                self.prompt = improved.trim().to_string();
                self.notifier.notify(Notification::info(
                    "Prompt improved",
                    "The prompt has been rewritten.",
                ));
                Some(self.prompt.clone())
            }
            Err(e) => {
                log::warn!("composer: prompt improvement failed: {e}");
                self.notifier.notify(Notification::error(
                    "Error",
                    "Could not improve the prompt. Please try again.",
                ));
                None
            }
        }
    }

    /// Generate an image from the current prompt and insert it.
    pub async fn generate_image(
        &mut self,
        generator: &dyn ImageGeneration,
        config: &ImageConfig,
    ) -> Option<String> {
        let prompt = self.prompt_or_notify()?;
        let request = ImageRequest::new(prompt, config);
        match generator.generate_image(&request).await {
            Ok(image) => {
                let html = self.insert_image(image);
                self.notifier.notify(Notification::info(
                    "Image generated",
                    "The image has been added to the document.",
                ));
                Some(html)
            }
            Err(e) => {
                log::warn!("composer: image generation failed: {e}");
                self.notifier.notify(Notification::error(
                    "Error",
                    "Could not generate the image. Please try again.",
                ));
                None
            }
        }
    }

    fn prompt_or_notify(&self) -> Option<String> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            self.notifier.notify(Notification::error(
                "Empty prompt",
                "Write a prompt first.",
            ));
            return None;
        }
        Some(prompt.to_string())
    }
}
