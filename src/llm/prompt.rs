//! Prompt builder for transcript correction and content generation.
//!
//! Every prompt is a `(system_msg, user_msg)` pair for an OpenAI-compatible
//! `/v1/chat/completions` endpoint.  The language is chosen at construction
//! time from a BCP-47 tag (`"es-ES"`, `"en"`, ...); Spanish and English have
//! dedicated instructions, anything else uses English.

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const CORRECTION_ES: &str = "\
Eres un corrector de texto. Tu tarea es corregir la ortografía y mejorar la \
sintaxis del texto proporcionado, manteniendo el significado original. Solo \
devuelve el texto corregido, sin explicaciones adicionales.";

const CORRECTION_EN: &str = "\
You are a text corrector. Fix the spelling and improve the syntax of the \
provided text while keeping its original meaning. Reply with ONLY the \
corrected text, without any explanation.";

const WRITING_ES: &str = "\
Eres un asistente de escritura. Da formato a tus respuestas con párrafos bien \
separados, dejando una línea en blanco entre cada párrafo.";

const WRITING_EN: &str = "\
You are a writing assistant. Format your responses with proper paragraph \
spacing, separating each paragraph with a blank line.";

const IMPROVE_ES: &str = "\
Eres un experto en redactar instrucciones para modelos de lenguaje. Reescribe \
el prompt del usuario para que sea más claro, específico y completo, sin \
cambiar su intención. Devuelve solo el prompt mejorado.";

const IMPROVE_EN: &str = "\
You are an expert at writing instructions for language models. Rewrite the \
user's prompt so it is clearer, more specific and complete, without changing \
its intent. Reply with ONLY the improved prompt.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds chat-message prompts for the three request kinds the composer makes.
///
/// # Example
/// ```rust
/// use dictation_composer::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new("es-ES");
/// let (system, user) = builder.correction_chat("ola que tal");
/// assert!(system.contains("corrector"));
/// assert_eq!(user, "ola que tal");
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
}

impl PromptBuilder {
    /// Create a builder for a BCP-47 tag; only the primary subtag matters.
    pub fn new(language: &str) -> Self {
        let primary = language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self { language: primary }
    }

    /// Primary language subtag this builder selected (`"es"`, `"en"`, ...).
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Spelling/syntax correction of a dictated transcript.  The transcript
    /// is sent verbatim as the user message.
    pub fn correction_chat(&self, text: &str) -> (String, String) {
        let system = match self.language.as_str() {
            "es" => CORRECTION_ES,
            _ => CORRECTION_EN,
        };
        (system.to_string(), text.to_string())
    }

    /// Free-form writing from a user prompt; the reply is expected to use
    /// blank lines between paragraphs.
    pub fn generation_chat(&self, prompt: &str) -> (String, String) {
        let system = match self.language.as_str() {
            "es" => WRITING_ES,
            _ => WRITING_EN,
        };
        (system.to_string(), prompt.to_string())
    }

    /// Rewrite a user prompt into a better one.
    pub fn improvement_chat(&self, prompt: &str) -> (String, String) {
        let system = match self.language.as_str() {
            "es" => IMPROVE_ES,
            _ => IMPROVE_EN,
        };
        (system.to_string(), prompt.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
