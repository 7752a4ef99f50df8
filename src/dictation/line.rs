//! Line-oriented streaming transcription backend.
//!
//! Stands in for a platform speech recognizer on hosts without one: some
//! upstream (stdin, a socket, an external STT process) pushes one finished
//! utterance per line into a channel, and each line becomes one final
//! recognition result.  Blank lines are skipped.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::dictation::recognizer::{
    RecognitionBackend, RecognitionEvent, RecognitionOptions, RecognitionResult,
    RecognitionSink, SpeechRecognizer,
};

/// Shared line source.  Only one recognizer reads it at a time; a new
/// recognizer waits until the previous one has let go.
#[derive(Clone)]
pub struct LineBackend {
    lines: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl LineBackend {
    pub fn new(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(lines)),
        }
    }
}

impl RecognitionBackend for LineBackend {
    fn create(&self, options: &RecognitionOptions) -> Option<Box<dyn SpeechRecognizer>> {
        Some(Box::new(LineRecognizer {
            lines: Arc::clone(&self.lines),
            language: options.language.clone(),
            cancel: None,
        }))
    }
}

struct LineRecognizer {
    lines: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    language: String,
    /// Dropping the sender ends the reader task.
    cancel: Option<oneshot::Sender<()>>,
}

impl SpeechRecognizer for LineRecognizer {
    fn start(&mut self, sink: RecognitionSink) -> Result<(), String> {
        if self.cancel.is_some() {
            return Err("recognizer already started".into());
        }

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        self.cancel = Some(cancel_tx);

        let lines = Arc::clone(&self.lines);
        log::debug!(
            "line recognizer: listening (language {}, generation {})",
            self.language,
            sink.generation()
        );

        tokio::spawn(async move {
            let mut lines = lines.lock().await;
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    line = lines.recv() => match line {
                        Some(line) => {
                            let text = line.trim();
                            if text.is_empty() {
                                continue;
                            }
                            let event = RecognitionEvent::Results(vec![
                                RecognitionResult::new(text, true),
                            ]);
                            if !sink.emit(event) {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            sink.emit(RecognitionEvent::End);
        });

        Ok(())
    }

    fn stop(&mut self) {
        self.cancel = None;
    }
}
