//! Application entry point — voice assistant terminal front end.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and apply
//!    the `HF_TOKEN` environment override.
//! 3. Build the inference client, capture and playback devices.
//! 4. Construct the [`AssistantPipeline`] and spawn the snapshot printer.
//! 5. Read intents from stdin until EOF or `quit`.
//!
//! The stdin loop is a stand-in presentation layer: it issues intents and
//! renders published [`TurnSnapshot`]s, nothing more.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use voice_assistant::{
    audio::{AudioCapture, AudioPlayback},
    config::{AppConfig, AppPaths},
    inference::{HfInferenceClient, InferenceApi},
    pipeline::{AssistantPipeline, TurnSnapshot, TurnState},
};

const USAGE: &str = "\
commands:
  begin                      start recording
  end                        stop recording and run the turn
  image <path> [question]    ask a question about an image
  caption <path>             describe an image
  state                      print the current turn
  reset                      discard the current turn
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice assistant starting up");

    // 2. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // The credential may come from the environment instead of settings.toml.
    if config.inference.api_token.is_empty() {
        if let Ok(token) = std::env::var("HF_TOKEN") {
            config.inference.api_token = token;
        }
    }
    if config.inference.api_token.is_empty() {
        log::warn!("no API token configured; hosted endpoints may reject requests");
    }

    let paths = AppPaths::new();

    // 3. Collaborators
    let client = Arc::new(HfInferenceClient::from_config(&config.inference));
    let recorder = Arc::new(AudioCapture::new(&config.audio, paths.capture_file.clone()));
    let player = Arc::new(AudioPlayback::new().context("audio output unavailable")?);

    // 4. Pipeline + snapshot printer
    let (pipeline, mut events) = AssistantPipeline::new(
        Arc::clone(&client) as Arc<dyn InferenceApi>,
        recorder,
        player,
    );

    tokio::spawn(async move {
        while let Some(snapshot) = events.recv().await {
            print_snapshot(&snapshot);
        }
    });

    // 5. Intent loop
    println!("{USAGE}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "begin" | "b" => {
                pipeline.begin_recording();
            }
            "end" | "e" => {
                pipeline.end_recording();
            }
            "image" | "i" => {
                let (path, question) = match rest.split_once(' ') {
                    Some((path, question)) => (path, question.trim().to_string()),
                    None => (rest, String::new()),
                };
                if path.is_empty() {
                    println!("usage: image <path> [question]");
                    continue;
                }
                match tokio::fs::read(path).await {
                    Ok(bytes) => {
                        pipeline.submit_image(bytes, question);
                    }
                    Err(e) => println!("could not read {path}: {e}"),
                }
            }
            "caption" | "c" => {
                if rest.is_empty() {
                    println!("usage: caption <path>");
                    continue;
                }
                match tokio::fs::read(rest).await {
                    Ok(bytes) => match client.caption_image(&bytes).await {
                        Ok(caption) => println!("caption: {caption}"),
                        Err(e) => println!("caption failed: {e}"),
                    },
                    Err(e) => println!("could not read {rest}: {e}"),
                }
            }
            "state" | "s" => match pipeline.current_turn() {
                Some(snapshot) => print_snapshot(&snapshot),
                None => println!("no turn yet"),
            },
            "reset" | "r" => pipeline.reset(),
            "quit" | "q" => break,
            other => println!("unknown command {other:?}\n{USAGE}"),
        }
    }

    log::info!("voice assistant shutting down");
    Ok(())
}

fn print_snapshot(snapshot: &TurnSnapshot) {
    let mut line = format!("[{}] {}", snapshot.id, snapshot.state.label());

    if snapshot.state == TurnState::Transcribing || snapshot.state == TurnState::Generating {
        line.push_str(" …");
    }
    if let Some(transcript) = &snapshot.transcript {
        line.push_str(&format!("  you: {transcript}"));
    }
    if let Some(response) = &snapshot.response_text {
        line.push_str(&format!("  assistant: {response}"));
    }
    if let Some(error) = &snapshot.error {
        line.push_str(&format!("  ({error})"));
    }

    println!("{line}");
}
