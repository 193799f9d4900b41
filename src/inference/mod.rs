//! Inference endpoint adapter.
//!
//! This module provides:
//! * [`InferenceApi`] — async trait covering the five capabilities the
//!   pipeline needs (transcribe, generate, VQA, captioning, synthesis).
//! * [`HfInferenceClient`] — hosted-endpoint REST implementation.
//! * [`extract_text`] — lenient decoding of the variant JSON response
//!   shapes text endpoints return.
//! * [`InferenceError`] — typed failures; calls never panic into the caller.

pub mod client;
pub mod decode;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{HfInferenceClient, InferenceApi, InferenceError};
pub use decode::extract_text;
