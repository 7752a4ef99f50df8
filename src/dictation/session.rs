//! Dictation session: drives one recognizer at a time through
//! listen → correct → deliver, with silence auto-stop.
//!
//! # Flow
//!
//! ```text
//! DictationCommand::Start
//!   └─▶ backend.create() ── None ──▶ UnsupportedCapability (notify, stay Idle)
//!         └─▶ recognizer.start(sink@generation)             [Listening]
//!
//! RecognitionEvent::Results (generation matches)
//!   └─▶ cancel silence timer
//!       └─▶ spawn corrector.correct(transcript)
//!             └─▶ Corrected (generation still matches)
//!                   └─▶ DictationOutput::Transcript, arm silence timer
//!
//! silence timer fires                                       [AutoStopping]
//!   └─▶ recognizer.stop(), DictationOutput::AutoStopped     [Idle]
//!
//! DictationCommand::Stop
//!   └─▶ recognizer.stop(), cancel timer                     [Idle]
//!
//! RecognitionEvent::End (recognizer quit on its own)        [Idle]
//!   └─▶ corrections still in flight are delivered, then DictationOutput::Ended
//!       (a Start or Stop before they land drops them and sends Ended at once)
//! ```
//!
//! Corrections run on spawned tasks so a slow correction never holds up a
//! `Stop`.  Every message coming back into the session carries the generation
//! it was issued under; anything not matching the live recognizer (or the one
//! still draining after `End`) is dropped.  The silence timer is only armed
//! while no correction is outstanding.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::DictationConfig;
use crate::dictation::recognizer::{
    combined_transcript, RecognitionBackend, RecognitionEvent, RecognitionOptions,
    RecognitionSink, SpeechRecognizer,
};
use crate::dictation::state::{new_shared_state, DictationStatus, SharedDictationState};
use crate::llm::TextCorrector;
use crate::notify::{Notification, Notifier};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DictationError {
    /// The runtime offers no speech recognition.
    #[error("speech recognition is not supported on this runtime")]
    UnsupportedCapability,

    /// The recognizer refused to start.
    #[error("speech recognizer failed to start: {0}")]
    Recognizer(String),
}

/// Host → session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationCommand {
    Start,
    Stop,
}

/// Session → host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationOutput {
    /// Corrected transcript, ready for insertion.
    Transcript(String),
    /// The silence timer stopped the session.
    AutoStopped,
    /// The recognizer ended on its own.
    Ended,
}

// ---------------------------------------------------------------------------
// Internal messages
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct SessionMessage {
    pub(crate) generation: u64,
    pub(crate) body: SessionMessageBody,
}

#[derive(Debug)]
pub(crate) enum SessionMessageBody {
    Recognition(RecognitionEvent),
    Corrected(String),
}

struct ActiveRecognizer {
    generation: u64,
    handle: Box<dyn SpeechRecognizer>,
    /// Corrections spawned for this recognizer and not yet delivered.
    pending: usize,
}

/// A recognizer that ended by itself while corrections were outstanding.
struct Draining {
    generation: u64,
    pending: usize,
}

// ---------------------------------------------------------------------------
// DictationSession
// ---------------------------------------------------------------------------

/// Owns the recognizer lifecycle for one dictation target.
///
/// Drive it with [`run`](Self::run) on a tokio task, or call
/// [`start`](Self::start) / [`stop`](Self::stop) directly before spawning.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
/// use dictation_composer::config::DictationConfig;
/// use dictation_composer::dictation::{DictationCommand, DictationSession, NoRecognition};
/// use dictation_composer::llm::PassthroughCorrector;
/// use dictation_composer::notify::LogNotifier;
///
/// # async fn example() {
/// let (out_tx, mut out_rx) = mpsc::unbounded_channel();
/// let session = DictationSession::new(
///     DictationConfig::default(),
///     Arc::new(NoRecognition),
///     Arc::new(PassthroughCorrector),
///     Arc::new(LogNotifier),
///     out_tx,
/// );
/// let (cmd_tx, cmd_rx) = mpsc::channel(8);
/// tokio::spawn(session.run(cmd_rx));
/// cmd_tx.send(DictationCommand::Start).await.unwrap();
/// while let Some(output) = out_rx.recv().await {
///     println!("{output:?}");
/// }
/// # }
/// ```
pub struct DictationSession {
    config: DictationConfig,
    backend: Arc<dyn RecognitionBackend>,
    corrector: Arc<dyn TextCorrector>,
    notifier: Arc<dyn Notifier>,
    output: mpsc::UnboundedSender<DictationOutput>,
    state: SharedDictationState,
    active: Option<ActiveRecognizer>,
    draining: Option<Draining>,
    inbox_tx: mpsc::UnboundedSender<SessionMessage>,
    inbox_rx: mpsc::UnboundedReceiver<SessionMessage>,
}

impl DictationSession {
    pub fn new(
        config: DictationConfig,
        backend: Arc<dyn RecognitionBackend>,
        corrector: Arc<dyn TextCorrector>,
        notifier: Arc<dyn Notifier>,
        output: mpsc::UnboundedSender<DictationOutput>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            config,
            backend,
            corrector,
            notifier,
            output,
            state: new_shared_state(),
            active: None,
            draining: None,
            inbox_tx,
            inbox_rx,
        }
    }

    /// Handle to the state this session publishes.
    pub fn state(&self) -> SharedDictationState {
        Arc::clone(&self.state)
    }

    pub fn status(&self) -> DictationStatus {
        self.state.lock().unwrap().status
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed, then release any live recognizer.
    pub async fn run(mut self, mut commands: mpsc::Receiver<DictationCommand>) {
        loop {
            let deadline = self.state.lock().unwrap().silence_deadline;

            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(DictationCommand::Start) => {
                        if let Err(e) = self.start() {
                            log::warn!("dictation: start failed: {e}");
                        }
                    }
                    Some(DictationCommand::Stop) => self.stop(),
                    None => break,
                },
                Some(msg) = self.inbox_rx.recv() => self.handle_message(msg),
                () = silence_elapsed(deadline) => self.auto_stop(),
            }
        }

        if self.active.is_some() {
            self.stop();
        }
        log::info!("dictation: command channel closed, session shutting down");
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Idle → Listening.  A second start while listening is ignored.
    pub fn start(&mut self) -> Result<(), DictationError> {
        if self.active.is_some() {
            log::debug!("dictation: start ignored, already listening");
            return Ok(());
        }

        let options = RecognitionOptions::from_config(&self.config);
        let Some(mut handle) = self.backend.create(&options) else {
            self.notifier.notify(Notification::error(
                "Error",
                "Speech recognition is not supported on this runtime.",
            ));
            return Err(DictationError::UnsupportedCapability);
        };

        let generation = self.state.lock().unwrap().generation + 1;
        let sink = RecognitionSink::new(generation, self.inbox_tx.clone());
        if let Err(reason) = handle.start(sink) {
            log::error!("dictation: recognizer failed to start: {reason}");
            self.notifier.notify(Notification::error(
                "Error",
                format!("Could not start the microphone: {reason}"),
            ));
            return Err(DictationError::Recognizer(reason));
        }

        self.abandon_drain();
        {
            let mut st = self.state.lock().unwrap();
            st.reset();
            st.generation = generation;
            st.status = DictationStatus::Listening;
        }
        self.active = Some(ActiveRecognizer {
            generation,
            handle,
            pending: 0,
        });

        log::debug!("dictation: Idle → Listening (generation {generation})");
        self.notifier
            .notify(Notification::info("Microphone on", "You can start speaking."));
        Ok(())
    }

    /// Listening → Idle.  No-op while idle, except that corrections still
    /// draining from an ended recognizer are abandoned.
    pub fn stop(&mut self) {
        let Some(mut active) = self.active.take() else {
            if !self.abandon_drain() {
                log::debug!("dictation: stop ignored, not listening");
            }
            return;
        };

        active.handle.stop();
        self.state.lock().unwrap().reset();

        log::debug!("dictation: Listening → Idle (generation {})", active.generation);
        self.notifier.notify(Notification::info(
            "Microphone off",
            "You turned the microphone off.",
        ));
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.generation == generation)
    }

    fn is_draining(&self, generation: u64) -> bool {
        self.draining
            .as_ref()
            .is_some_and(|d| d.generation == generation)
    }

    fn handle_message(&mut self, msg: SessionMessage) {
        if self.is_draining(msg.generation) {
            if let SessionMessageBody::Corrected(text) = msg.body {
                self.on_drained(text);
            }
            return;
        }

        if !self.is_current(msg.generation) {
            log::debug!(
                "dictation: dropping stale message from generation {}",
                msg.generation
            );
            return;
        }

        match msg.body {
            SessionMessageBody::Recognition(RecognitionEvent::Results(results)) => {
                let transcript = combined_transcript(&results);
                self.on_transcript(msg.generation, transcript);
            }
            SessionMessageBody::Recognition(RecognitionEvent::Error(reason)) => {
                log::error!("dictation: recognition error: {reason}");
                self.notifier.notify(Notification::error(
                    "Speech recognition error",
                    reason,
                ));
            }
            SessionMessageBody::Recognition(RecognitionEvent::End) => self.on_end(),
            SessionMessageBody::Corrected(text) => self.on_corrected(text),
        }
    }

    /// A result event: cancel the silence timer and send the transcript off
    /// for correction.
    fn on_transcript(&mut self, generation: u64, transcript: String) {
        {
            let mut st = self.state.lock().unwrap();
            st.silence_deadline = None;
            st.last_transcript = transcript.clone();
        }

        if transcript.trim().is_empty() {
            // Nothing to correct or deliver, but the recognizer is alive.
            self.arm_silence_timer_if_idle();
            return;
        }

        if let Some(active) = self.active.as_mut() {
            active.pending += 1;
        }

        let corrector = Arc::clone(&self.corrector);
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let text = corrector.correct(&transcript).await;
            let _ = inbox.send(SessionMessage {
                generation,
                body: SessionMessageBody::Corrected(text),
            });
        });
    }

    fn on_corrected(&mut self, text: String) {
        if let Some(active) = self.active.as_mut() {
            active.pending = active.pending.saturating_sub(1);
        }
        let _ = self.output.send(DictationOutput::Transcript(text));
        self.arm_silence_timer_if_idle();
    }

    /// The recognizer ended without being asked to.  Outstanding corrections
    /// are still delivered; `Ended` follows the last of them.
    fn on_end(&mut self) {
        self.state.lock().unwrap().reset();

        let Some(active) = self.active.take() else {
            return;
        };
        log::debug!(
            "dictation: recognizer ended on its own (generation {}, {} pending)",
            active.generation,
            active.pending
        );

        if active.pending == 0 {
            let _ = self.output.send(DictationOutput::Ended);
        } else {
            self.draining = Some(Draining {
                generation: active.generation,
                pending: active.pending,
            });
        }
    }

    /// Drop corrections still draining from an ended recognizer and close
    /// that session with `Ended`.  Returns whether anything was draining.
    fn abandon_drain(&mut self) -> bool {
        let Some(draining) = self.draining.take() else {
            return false;
        };
        log::debug!(
            "dictation: dropping {} pending correction(s) of generation {}",
            draining.pending,
            draining.generation
        );
        let _ = self.output.send(DictationOutput::Ended);
        true
    }

    fn on_drained(&mut self, text: String) {
        let _ = self.output.send(DictationOutput::Transcript(text));

        let Some(draining) = self.draining.as_mut() else {
            return;
        };
        draining.pending = draining.pending.saturating_sub(1);
        if draining.pending == 0 {
            self.draining = None;
            let _ = self.output.send(DictationOutput::Ended);
        }
    }

    fn auto_stop(&mut self) {
        self.state.lock().unwrap().status = DictationStatus::AutoStopping;

        if let Some(mut active) = self.active.take() {
            active.handle.stop();
            log::debug!(
                "dictation: silence timeout, AutoStopping → Idle (generation {})",
                active.generation
            );
        }
        self.state.lock().unwrap().reset();

        let _ = self.output.send(DictationOutput::AutoStopped);
        let secs = self.config.silence_timeout().as_secs_f32();
        self.notifier.notify(Notification::info(
            "Microphone off",
            format!("{secs} seconds of silence detected."),
        ));
    }

    /// Arm the silence timer unless a correction is still outstanding.
    fn arm_silence_timer_if_idle(&self) {
        if self.active.as_ref().is_some_and(|a| a.pending > 0) {
            return;
        }
        let deadline = Instant::now().checked_add(self.config.silence_timeout());
        if deadline.is_none() {
            log::warn!("dictation: silence timeout out of range, auto-stop disabled");
        }
        self.state.lock().unwrap().silence_deadline = deadline;
    }
}

/// Resolves at `deadline`; never resolves without one.
async fn silence_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
