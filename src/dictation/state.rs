//! Dictation status and the state shared with the host.
//!
//! [`DictationSession`](crate::dictation::DictationSession) is the only
//! writer; hosts read [`SharedDictationState`] to drive their listening
//! indicator.

use std::sync::{Arc, Mutex};

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// DictationStatus
// ---------------------------------------------------------------------------

/// Lifecycle of one dictation session.
///
/// ```text
/// Idle ──start()──▶ Listening ──stop()──────────────▶ Idle
///                       │
///                       └──silence timer──▶ AutoStopping ──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DictationStatus {
    #[default]
    Idle,
    Listening,
    /// Transient: the silence timer fired and the recognizer is being torn
    /// down.
    AutoStopping,
}

impl DictationStatus {
    /// `true` while a recognizer is (or is being) held.
    ///
    /// ```
    /// use dictation_composer::dictation::DictationStatus;
    ///
    /// assert!(!DictationStatus::Idle.is_active());
    /// assert!(DictationStatus::Listening.is_active());
    /// assert!(DictationStatus::AutoStopping.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        !matches!(self, DictationStatus::Idle)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DictationStatus::Idle => "Idle",
            DictationStatus::Listening => "Listening",
            DictationStatus::AutoStopping => "Stopping",
        }
    }
}

// ---------------------------------------------------------------------------
// DictationState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct DictationState {
    pub status: DictationStatus,
    /// Raw (uncorrected) transcript of the most recent result event.
    pub last_transcript: String,
    /// When the session stops itself unless another result arrives first.
    pub silence_deadline: Option<Instant>,
    /// Identity of the current (or most recent) recognizer.  Bumped on every
    /// successful start.
    pub generation: u64,
}

impl DictationState {
    /// Back to `Idle`, keeping the generation counter.
    pub fn reset(&mut self) {
        self.status = DictationStatus::Idle;
        self.last_transcript.clear();
        self.silence_deadline = None;
    }
}

/// Thread-safe handle to [`DictationState`].
///
/// Lock for a short critical section only; never hold the guard across an
/// `.await`.
pub type SharedDictationState = Arc<Mutex<DictationState>>;

pub fn new_shared_state() -> SharedDictationState {
    Arc::new(Mutex::new(DictationState::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
