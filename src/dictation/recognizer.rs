//! Speech-recognition host capability.
//!
//! A [`RecognitionBackend`] hands out [`SpeechRecognizer`]s; a recognizer
//! reports [`RecognitionEvent`]s through the [`RecognitionSink`] it was
//! started with.  Every sink is stamped with the session generation that
//! created it, so events from a recognizer the session has already let go of
//! can be recognised and dropped.

use tokio::sync::mpsc;

use crate::config::DictationConfig;
use crate::dictation::session::{SessionMessage, SessionMessageBody};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// BCP-47 language tag.
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionOptions {
    pub fn from_config(config: &DictationConfig) -> Self {
        Self {
            language: config.language.clone(),
            continuous: config.continuous,
            interim_results: config.interim_results,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One hypothesis for a recognised segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f32,
}

/// One recognised segment; `alternatives[0]` is the best guess.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub alternatives: Vec<Alternative>,
    pub is_final: bool,
}

impl RecognitionResult {
    /// Single-alternative result.
    pub fn new(transcript: impl Into<String>, is_final: bool) -> Self {
        Self {
            alternatives: vec![Alternative {
                transcript: transcript.into(),
                confidence: 1.0,
            }],
            is_final,
        }
    }

    pub fn best(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// The current result list (partial and final) of the utterance.
    Results(Vec<RecognitionResult>),
    /// The recognizer reported an error; it may or may not end afterwards.
    Error(String),
    /// The recognizer has stopped delivering events.
    End,
}

/// Concatenate the best alternative of every result, in order.
pub fn combined_transcript(results: &[RecognitionResult]) -> String {
    results.iter().filter_map(RecognitionResult::best).collect()
}

// ---------------------------------------------------------------------------
// RecognitionSink
// ---------------------------------------------------------------------------

/// Where a recognizer sends its events.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl RecognitionSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Forward one event.  Returns `false` once the session is gone.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.tx
            .send(SessionMessage {
                generation: self.generation,
                body: SessionMessageBody::Recognition(event),
            })
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One recognizer instance, owned by the session between `start` and `stop`.
pub trait SpeechRecognizer: Send {
    /// Begin recognising; events go to `sink` until [`stop`](Self::stop).
    fn start(&mut self, sink: RecognitionSink) -> Result<(), String>;

    /// Stop recognising.  Events already in flight may still arrive.
    fn stop(&mut self);
}

/// Factory for recognizers.  Returns `None` when the runtime has no speech
/// recognition capability.
pub trait RecognitionBackend: Send + Sync {
    fn create(&self, options: &RecognitionOptions) -> Option<Box<dyn SpeechRecognizer>>;
}

/// Backend for runtimes without speech recognition.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecognition;

impl RecognitionBackend for NoRecognition {
    fn create(&self, _options: &RecognitionOptions) -> Option<Box<dyn SpeechRecognizer>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_transcript_takes_best_alternative_of_each_result() {
        let results = vec![
            RecognitionResult {
                alternatives: vec![
                    Alternative {
                        transcript: "hola".into(),
                        confidence: 0.9,
                    },
                    Alternative {
                        transcript: "ola".into(),
                        confidence: 0.4,
                    },
                ],
                is_final: true,
            },
            RecognitionResult::new(" que tal", false),
        ];
        assert_eq!(combined_transcript(&results), "hola que tal");
    }

    #[test]
    fn results_without_alternatives_are_skipped() {
        let results = vec![
            RecognitionResult {
                alternatives: vec![],
                is_final: false,
            },
            RecognitionResult::new("sí", true),
        ];
        assert_eq!(combined_transcript(&results), "sí");
        assert_eq!(combined_transcript(&[]), "");
    }

    #[test]
    fn options_follow_config() {
        let opts = RecognitionOptions::from_config(&DictationConfig::default());
        assert_eq!(opts.language, "es-ES");
        assert!(opts.continuous);
        assert!(opts.interim_results);
    }

    #[test]
    fn sink_tags_events_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = RecognitionSink::new(3, tx);

        assert!(sink.emit(RecognitionEvent::End));
        let msg = rx.try_recv().expect("message");
        assert_eq!(msg.generation, 3);
        assert!(matches!(
            msg.body,
            SessionMessageBody::Recognition(RecognitionEvent::End)
        ));

        drop(rx);
        assert!(!sink.emit(RecognitionEvent::End));
    }

    #[test]
    fn no_recognition_backend_creates_nothing() {
        let opts = RecognitionOptions::from_config(&DictationConfig::default());
        assert!(NoRecognition.create(&opts).is_none());
    }
}
