//! Local audio pipeline — microphone capture and speaker playback.
//!
//! # Capture path
//!
//! ```text
//! Microphone → cpal callback → RecordingBuffer (tail-retaining)
//!            → downmix_to_mono → resample → encode_wav_mono
//!            → RecordingHandle (WAV bytes + artifact path)
//! ```
//!
//! # Playback path
//!
//! ```text
//! synthesized bytes → rodio Decoder → Sink → completion observed by poll
//! ```
//!
//! Both device-facing halves run on dedicated worker threads because the
//! underlying stream types are not `Send`; the public [`AudioCapture`] and
//! [`AudioPlayback`] handles are `Send + Sync` and sit behind the
//! [`Recorder`] / [`Player`] trait seams the pipeline (and its tests) use.

pub mod buffer;
pub mod capture;
pub mod encode;
pub mod playback;
pub mod resample;

pub use buffer::RecordingBuffer;
pub use capture::{AudioCapture, CaptureError, Recorder, RecordingHandle};
pub use encode::encode_wav_mono;
pub use playback::{AudioPlayback, PlaybackError, Player};
pub use resample::{downmix_to_mono, resample};
