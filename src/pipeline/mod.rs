//! Turn coordination for the voice assistant.
//!
//! This module wires the full record → transcribe → generate → synthesize →
//! play chain and exposes the snapshot stream the presentation layer reads.
//!
//! # Architecture
//!
//! ```text
//! presentation intents
//!   begin_recording / end_recording / submit_image / reset
//!        │
//!        ▼
//! AssistantPipeline ── owns the single active Turn
//!        │
//!        ├─ Recorder (audio::AudioCapture)   capture session
//!        ├─ InferenceApi (HfInferenceClient) transcribe/generate/vqa/tts
//!        └─ Player (audio::AudioPlayback)    reply playback
//!        │
//!        ▼
//! TurnSnapshot events (tokio mpsc) ──▶ presentation layer
//! ```
//!
//! Exactly one Turn is in flight at a time; a new intent supersedes the
//! previous Turn and late results are dropped by TurnId comparison.

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::AssistantPipeline;
pub use state::{InputModality, Turn, TurnError, TurnId, TurnSnapshot, TurnState};
