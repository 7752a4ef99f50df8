//! Application entry point: a line-oriented dictation composer.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the transcript corrector from config.
//! 5. Wire the stdin line backend, the dictation session and the composer.
//! 6. Read stdin until EOF or `/quit`.
//!
//! Lines starting with `/` are commands; anything else is treated as a
//! spoken utterance while dictation is active.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use dictation_composer::{
    composer::{Composer, DictationTarget},
    config::AppConfig,
    dictation::{DictationCommand, DictationOutput, DictationSession, LineBackend},
    editor::{CursorInsertionEngine, Surface},
    generate::{ContentGenerator, ImageGenerator},
    llm::{ApiCorrector, PassthroughCorrector, RateLimitedCorrector, TextCorrector},
    notify::{ChannelNotifier, Notification, NotificationLevel},
};

const HELP: &str = "\
commands:
  /start            start dictation (then type utterances, one per line)
  /stop             stop dictation
  /target doc|prompt  where dictated text goes
  /prompt <text>    set the generation prompt
  /clear            clear the prompt
  /improve          rewrite the prompt
  /generate         generate text from the prompt at the cursor
  /image            generate an image from the prompt at the cursor
  /cursor end|<block> <offset>  place the cursor
  /blur             drop the cursor (insertions append)
  /show             print the document
  /save             write the current settings to the config file
  /quit             exit";

/// One line of stdin input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    /// A `/name arg...` command; `arg` is trimmed and may be empty.
    Command { name: &'a str, arg: &'a str },
    /// Anything else: an utterance for the recognizer.
    Utterance(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(match line.strip_prefix('/') {
            Some(command) => {
                let (name, arg) = command
                    .split_once(char::is_whitespace)
                    .map(|(n, a)| (n, a.trim()))
                    .unwrap_or((command, ""));
                Input::Command { name, arg }
            }
            None => Input::Utterance(line),
        })
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Dictation composer starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 worker threads: session + corrections)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(run(config))
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

async fn run(config: AppConfig) -> Result<()> {
    // 4. Corrector
    let corrector: Arc<dyn TextCorrector> = if config.correction.enabled {
        Arc::new(RateLimitedCorrector::new(
            ApiCorrector::from_config(&config.correction, &config.dictation.language),
            &config.correction,
        ))
    } else {
        log::info!("Correction disabled; transcripts are delivered as recognised");
        Arc::new(PassthroughCorrector)
    };

    let text_generator = ContentGenerator::from_config(
        &config.generation,
        &config.correction,
        &config.dictation.language,
    );
    let image_generator = ImageGenerator::from_config(&config.image);

    // 5. Channels
    let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();
    let (command_tx, command_rx) = mpsc::channel::<DictationCommand>(16);
    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<DictationOutput>();
    let (notifier, mut notify_rx) = ChannelNotifier::channel();
    let notifier = Arc::new(notifier);

    let session = DictationSession::new(
        config.dictation.clone(),
        Arc::new(LineBackend::new(line_rx)),
        corrector,
        notifier.clone(),
        output_tx,
    );

    let mut composer = Composer::new(
        Surface::new(),
        CursorInsertionEngine::new(&config.editor),
        session.state(),
        notifier,
    );

    let session_task = tokio::spawn(session.run(command_rx));

    // 6. stdin
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else { break };

                match Input::parse(&line) {
                    None => continue,
                    Some(Input::Command { name, arg }) => match name {
                        "start" => command_tx.send(DictationCommand::Start).await?,
                        "stop" => command_tx.send(DictationCommand::Stop).await?,
                        "target" => match arg {
                            "doc" | "document" => composer.set_target(DictationTarget::Document),
                            "prompt" => composer.set_target(DictationTarget::Prompt),
                            _ => eprintln!("usage: /target doc|prompt"),
                        },
                        "prompt" => composer.set_prompt(arg),
                        "clear" => composer.clear_prompt(),
                        "improve" => {
                            if let Some(prompt) = composer.improve_prompt(&text_generator).await {
                                println!("prompt: {prompt}");
                            }
                        }
                        "generate" => {
                            if let Some(html) = composer.generate_text(&text_generator).await {
                                println!("{html}");
                            }
                        }
                        "image" => {
                            if let Some(html) = composer
                                .generate_image(&image_generator, &config.image)
                                .await
                            {
                                println!("{html}");
                            }
                        }
                        "cursor" => place_cursor(composer.surface_mut(), arg),
                        "blur" => composer.surface_mut().blur(),
                        "show" => {
                            println!("{}", composer.content());
                            println!("prompt: {}", composer.prompt());
                        }
                        "save" => match config.save() {
                            Ok(()) => eprintln!("settings saved"),
                            Err(e) => {
                                log::error!("Failed to save config: {e:#}");
                                eprintln!("could not save settings: {e}");
                            }
                        },
                        "quit" | "exit" => break,
                        _ => println!("{HELP}"),
                    },
                    Some(Input::Utterance(text)) => {
                        if composer.is_listening() {
                            // The session task may have gone away on shutdown.
                            let _ = line_tx.send(text.to_string());
                        } else {
                            eprintln!("not listening; /start first");
                        }
                    }
                }
            }

            Some(output) = output_rx.recv() => {
                if let Some(html) = composer.handle_output(output) {
                    println!("{html}");
                }
            }

            Some(notification) = notify_rx.recv() => print_notification(&notification),
        }
    }

    // Closing the command channel ends the session loop.
    drop(command_tx);
    if let Err(e) = session_task.await {
        log::warn!("Dictation session task failed: {e}");
    }

    log::info!("Dictation composer shut down");
    Ok(())
}

fn place_cursor(surface: &mut Surface, arg: &str) {
    if arg == "end" {
        surface.place_cursor_at_end();
        return;
    }
    let mut parts = arg.split_whitespace().map(str::parse::<usize>);
    match (parts.next(), parts.next()) {
        (Some(Ok(block)), Some(Ok(offset))) => surface.place_cursor(block, offset),
        _ => eprintln!("usage: /cursor end|<block> <offset>"),
    }
}

fn print_notification(n: &Notification) {
    match n.level {
        NotificationLevel::Info => eprintln!("[{}] {}", n.title, n.description),
        NotificationLevel::Error => eprintln!("[{}!] {}", n.title, n.description),
    }
}
