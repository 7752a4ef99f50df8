//! Dictation: speech recognition → correction → transcript delivery.
//!
//! # Architecture
//!
//! ```text
//! host ──DictationCommand──▶ DictationSession::run()  ← tokio task
//!                                   │
//!            RecognitionBackend ────┤ create() / start(sink@generation)
//!                                   │
//!        RecognitionEvent (tagged) ─┤──▶ TextCorrector::correct (spawned)
//!                                   │            │
//!                                   │◀── Corrected (tagged)
//!                                   │
//! host ◀──DictationOutput───────────┘  Transcript / AutoStopped / Ended
//!
//! SharedDictationState (Arc<Mutex<DictationState>>) ← read by the host
//! ```

pub mod line;
pub mod recognizer;
pub mod session;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use line::LineBackend;
pub use recognizer::{
    combined_transcript, Alternative, NoRecognition, RecognitionBackend, RecognitionEvent,
    RecognitionOptions, RecognitionResult, RecognitionSink, SpeechRecognizer,
};
pub use session::{DictationCommand, DictationError, DictationOutput, DictationSession};
pub use state::{new_shared_state, DictationState, DictationStatus, SharedDictationState};
