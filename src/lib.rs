//! Voice assistant pipeline — spoken question in, spoken answer out.
//!
//! One end-to-end turn runs record → transcribe → generate → synthesize →
//! play against hosted inference endpoints; image+question turns skip the
//! capture steps and go straight to visual question answering.
//!
//! # Modules
//!
//! * [`pipeline`] — the turn state machine and coordinator ([`pipeline::AssistantPipeline`]).
//! * [`inference`] — HTTP adapter to the transcription / generation / VQA /
//!   captioning / synthesis endpoints.
//! * [`audio`] — microphone capture and speaker playback.
//! * [`config`] — TOML settings and platform paths.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_assistant::audio::{AudioCapture, AudioPlayback};
//! use voice_assistant::config::{AppConfig, AppPaths};
//! use voice_assistant::inference::HfInferenceClient;
//! use voice_assistant::pipeline::AssistantPipeline;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::load().unwrap_or_default();
//!     let paths = AppPaths::new();
//!
//!     let client = Arc::new(HfInferenceClient::from_config(&config.inference));
//!     let recorder = Arc::new(AudioCapture::new(&config.audio, paths.capture_file));
//!     let player = Arc::new(AudioPlayback::new().expect("audio output"));
//!
//!     let (pipeline, mut events) = AssistantPipeline::new(client, recorder, player);
//!
//!     pipeline.begin_recording();
//!     // … user speaks, then:
//!     pipeline.end_recording();
//!
//!     while let Some(snapshot) = events.recv().await {
//!         println!("{}", snapshot.state.label());
//!         if snapshot.state.is_terminal() {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod audio;
pub mod config;
pub mod inference;
pub mod pipeline;
