//! Dictation → correction → insertion, wired the way the binary wires it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use dictation_composer::composer::{Composer, DictationTarget};
use dictation_composer::config::{CorrectionConfig, DictationConfig};
use dictation_composer::dictation::{
    DictationCommand, DictationOutput, DictationSession, LineBackend, SharedDictationState,
};
use dictation_composer::editor::{Block, CursorInsertionEngine, Surface};
use dictation_composer::generate::TextGeneration;
use dictation_composer::llm::{CorrectionService, LlmError, RateLimitedCorrector};
use dictation_composer::notify::ChannelNotifier;

/// Capitalises the first letter; optionally takes a while.
struct Capitalize {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl CorrectionService for Capitalize {
    async fn request_correction(&self, text: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let mut chars = text.chars();
        Ok(match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        })
    }
}

struct Harness {
    lines: mpsc::UnboundedSender<String>,
    commands: mpsc::Sender<DictationCommand>,
    outputs: mpsc::UnboundedReceiver<DictationOutput>,
    state: SharedDictationState,
    composer: Composer,
    calls: Arc<AtomicUsize>,
}

fn harness(surface: Surface, delay: Duration) -> Harness {
    let (lines, line_rx) = mpsc::unbounded_channel();
    let (commands, command_rx) = mpsc::channel(8);
    let (output_tx, outputs) = mpsc::unbounded_channel();
    let (notifier, _notes) = ChannelNotifier::channel();
    let notifier = Arc::new(notifier);
    let calls = Arc::new(AtomicUsize::new(0));

    let corrector = RateLimitedCorrector::new(
        Capitalize {
            calls: Arc::clone(&calls),
            delay,
        },
        &CorrectionConfig::default(),
    );

    let session = DictationSession::new(
        DictationConfig::default(),
        Arc::new(LineBackend::new(line_rx)),
        Arc::new(corrector),
        notifier.clone(),
        output_tx,
    );
    let state = session.state();
    let composer = Composer::new(
        surface,
        CursorInsertionEngine::default(),
        session.state(),
        notifier,
    );

    tokio::spawn(session.run(command_rx));

    Harness {
        lines,
        commands,
        outputs,
        state,
        composer,
        calls,
    }
}

async fn wait_for_transcript(state: &SharedDictationState, expected: &str) {
    loop {
        if state.lock().unwrap().last_transcript == expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn dictated_lines_are_corrected_and_inserted_at_cursor() {
    let mut surface = Surface::with_blocks(vec![Block::paragraph("Hello")]);
    surface.place_cursor_at_end();
    let mut h = harness(surface, Duration::ZERO);

    h.commands.send(DictationCommand::Start).await.unwrap();
    h.lines.send("world".into()).unwrap();

    let first = h.outputs.recv().await.unwrap();
    assert_eq!(first, DictationOutput::Transcript("World".into()));
    assert_eq!(
        h.composer.handle_output(first).as_deref(),
        Some("<p>Hello</p><p>World</p>")
    );
    assert!(h.composer.is_listening());

    // Inside the minimum interval: delivered uncorrected, no request made.
    h.lines.send("second thought".into()).unwrap();
    let second = h.outputs.recv().await.unwrap();
    assert_eq!(second, DictationOutput::Transcript("second thought".into()));
    assert_eq!(
        h.composer.handle_output(second).as_deref(),
        Some("<p>Hello</p><p>World</p><p>second thought</p>")
    );
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    // Then silence.
    let quiet_from = Instant::now();
    assert_eq!(h.outputs.recv().await, Some(DictationOutput::AutoStopped));
    assert!(quiet_from.elapsed() >= Duration::from_secs(5));
    assert!(!h.composer.is_listening());
}

#[tokio::test(start_paused = true)]
async fn correction_finishing_after_stop_is_dropped() {
    let mut h = harness(Surface::new(), Duration::from_secs(2));

    h.commands.send(DictationCommand::Start).await.unwrap();
    h.lines.send("too late".into()).unwrap();
    wait_for_transcript(&h.state, "too late").await;

    h.commands.send(DictationCommand::Stop).await.unwrap();

    let next = tokio::time::timeout(Duration::from_secs(30), h.outputs.recv()).await;
    assert!(next.is_err(), "expected nothing, got {next:?}");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.composer.content(), "");
}

#[tokio::test(start_paused = true)]
async fn restarted_session_keeps_inserting_after_previous_text() {
    let mut surface = Surface::new();
    surface.place_cursor_at_end();
    let mut h = harness(surface, Duration::ZERO);

    h.commands.send(DictationCommand::Start).await.unwrap();
    h.lines.send("uno".into()).unwrap();
    let out = h.outputs.recv().await.unwrap();
    h.composer.handle_output(out);
    h.commands.send(DictationCommand::Stop).await.unwrap();

    // Past the minimum interval, so the next one is corrected again.
    tokio::time::sleep(Duration::from_secs(6)).await;

    h.commands.send(DictationCommand::Start).await.unwrap();
    h.lines.send("dos".into()).unwrap();
    let out = h.outputs.recv().await.unwrap();
    let html = h.composer.handle_output(out);

    assert_eq!(html.as_deref(), Some("<p>Uno</p><p>Dos</p>"));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

/// Echoes the prompt back as two paragraphs.
struct Echo;

#[async_trait]
impl TextGeneration for Echo {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        Ok(format!("About {prompt}.\n\nThe end."))
    }

    async fn improve_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        Ok(prompt.to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn dictated_prompt_drives_generation_at_cursor() {
    let mut surface = Surface::with_blocks(vec![
        Block::paragraph("Intro"),
        Block::paragraph("Outro"),
    ]);
    surface.place_cursor(0, 5);
    let mut h = harness(surface, Duration::ZERO);
    h.composer.set_target(DictationTarget::Prompt);

    h.commands.send(DictationCommand::Start).await.unwrap();
    h.lines.send("cats".into()).unwrap();
    let out = h.outputs.recv().await.unwrap();
    assert_eq!(h.composer.handle_output(out), None);
    assert_eq!(h.composer.prompt(), "Cats");

    let html = h.composer.generate_text(&Echo).await;
    assert_eq!(
        html.as_deref(),
        Some("<p>Intro</p><p>About Cats.</p><p>The end.</p><p>Outro</p>")
    );
}
