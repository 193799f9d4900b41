//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] implements the [`Recorder`] seam: `start` opens a capture
//! session (acquiring the default input device), `stop` closes it and yields
//! a [`RecordingHandle`] with the session's audio as a 16-bit mono WAV.
//!
//! Only one session can be active; `start` while recording is a no-op.
//!
//! `cpal::Stream` is not `Send`, so all device objects live on a dedicated
//! worker thread; [`AudioCapture`] itself only holds the command channel and
//! is freely shareable across threads.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::buffer::RecordingBuffer;
use crate::audio::encode::encode_wav_mono;
use crate::audio::resample::{downmix_to_mono, resample};
use crate::config::AudioConfig;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or closing a capture session.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The input device could not be acquired (missing, busy, or denied).
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),

    /// `stop` was called with no session active.
    #[error("no recording in progress")]
    NothingRecorded,

    /// The WAV artifact could not be encoded or written.
    #[error("failed to store capture artifact: {0}")]
    Artifact(String),

    /// The capture worker thread has terminated.
    #[error("capture worker thread terminated")]
    WorkerGone,
}

// ---------------------------------------------------------------------------
// RecordingHandle
// ---------------------------------------------------------------------------

/// The audio produced by one completed capture session.
///
/// Carries the WAV bytes for the transcription request plus the path of the
/// on-disk artifact (one per session, overwritten each time).
#[derive(Debug, Clone)]
pub struct RecordingHandle {
    /// 16-bit mono PCM WAV bytes.
    pub wav: Vec<u8>,
    /// Where the artifact was written.
    pub path: PathBuf,
    /// Length of the recording in seconds.
    pub duration_secs: f32,
}

impl RecordingHandle {
    /// Returns `true` when the session captured no audio at all.
    pub fn is_empty(&self) -> bool {
        self.duration_secs <= 0.0
    }
}

// ---------------------------------------------------------------------------
// Recorder trait
// ---------------------------------------------------------------------------

/// Thread-safe interface for a single-session audio recorder.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn Recorder>` and driven from any thread.
///
/// # Contract
///
/// - At most one session is active; `start` while active is a no-op `Ok`.
/// - `stop` without an active session returns [`CaptureError::NothingRecorded`].
/// - `stop` on a session that produced no samples returns a handle for which
///   [`RecordingHandle::is_empty`] is `true` (the caller decides how to
///   surface that).
pub trait Recorder: Send + Sync {
    /// Open a capture session, acquiring the input device.
    fn start(&self) -> Result<(), CaptureError>;

    /// Close the active session and return its audio.
    fn stop(&self) -> Result<RecordingHandle, CaptureError>;
}

// ---------------------------------------------------------------------------
// Worker protocol
// ---------------------------------------------------------------------------

/// Raw session audio as delivered by the device, before downmix/resample.
struct RawRecording {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

enum WorkerCommand {
    Start {
        ack: mpsc::Sender<Result<(), CaptureError>>,
    },
    Stop {
        ack: mpsc::Sender<Result<RawRecording, CaptureError>>,
    },
}

/// Device objects for one live session, owned by the worker thread.
struct CaptureSession {
    /// Keeps the hardware stream alive; dropping it stops the callback.
    _stream: cpal::Stream,
    buffer: Arc<Mutex<RecordingBuffer>>,
    sample_rate: u32,
    channels: u16,
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Production [`Recorder`] backed by the system default input device.
pub struct AudioCapture {
    commands: mpsc::Sender<WorkerCommand>,
    artifact_path: PathBuf,
    target_rate: u32,
}

impl AudioCapture {
    /// Create the recorder and spawn its worker thread.
    ///
    /// No device is touched until the first [`Recorder::start`]; a machine
    /// without a microphone can still construct the pipeline and will see
    /// [`CaptureError::DeviceUnavailable`] when recording is attempted.
    pub fn new(config: &AudioConfig, artifact_path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        let max_secs = config.max_recording_secs;

        std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || capture_worker(rx, max_secs))
            .expect("failed to spawn audio-capture thread");

        Self {
            commands: tx,
            artifact_path,
            target_rate: config.sample_rate,
        }
    }
}

impl Recorder for AudioCapture {
    fn start(&self) -> Result<(), CaptureError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.commands
            .send(WorkerCommand::Start { ack: ack_tx })
            .map_err(|_| CaptureError::WorkerGone)?;
        ack_rx.recv().map_err(|_| CaptureError::WorkerGone)?
    }

    fn stop(&self) -> Result<RecordingHandle, CaptureError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.commands
            .send(WorkerCommand::Stop { ack: ack_tx })
            .map_err(|_| CaptureError::WorkerGone)?;
        let raw = ack_rx.recv().map_err(|_| CaptureError::WorkerGone)??;

        let mono = downmix_to_mono(&raw.samples, raw.channels);
        let resampled = resample(&mono, raw.sample_rate, self.target_rate);
        let duration_secs = resampled.len() as f32 / self.target_rate as f32;

        let wav = encode_wav_mono(&resampled, self.target_rate)
            .map_err(|e| CaptureError::Artifact(e.to_string()))?;

        if let Some(parent) = self.artifact_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CaptureError::Artifact(e.to_string()))?;
        }
        std::fs::write(&self.artifact_path, &wav)
            .map_err(|e| CaptureError::Artifact(e.to_string()))?;

        log::debug!(
            "capture: session closed ({duration_secs:.2}s → {})",
            self.artifact_path.display()
        );

        Ok(RecordingHandle {
            wav,
            path: self.artifact_path.clone(),
            duration_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Worker thread
// ---------------------------------------------------------------------------

fn capture_worker(rx: mpsc::Receiver<WorkerCommand>, max_secs: f32) {
    let mut session: Option<CaptureSession> = None;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            WorkerCommand::Start { ack } => {
                if session.is_some() {
                    // Already recording — idempotent no-op.
                    let _ = ack.send(Ok(()));
                    continue;
                }
                let result = open_session(max_secs);
                let _ = ack.send(match result {
                    Ok(s) => {
                        session = Some(s);
                        Ok(())
                    }
                    Err(e) => Err(e),
                });
            }
            WorkerCommand::Stop { ack } => match session.take() {
                Some(s) => {
                    drop(s._stream);
                    let samples = s
                        .buffer
                        .lock()
                        .map(|mut buf| buf.take())
                        .unwrap_or_default();
                    let _ = ack.send(Ok(RawRecording {
                        samples,
                        sample_rate: s.sample_rate,
                        channels: s.channels,
                    }));
                }
                None => {
                    let _ = ack.send(Err(CaptureError::NothingRecorded));
                }
            },
        }
    }
}

fn open_session(max_secs: f32) -> Result<CaptureSession, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        CaptureError::DeviceUnavailable("no input device on the default audio host".into())
    })?;

    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    // Capacity caps the session at max_secs; overflow keeps the tail.
    let capacity =
        ((sample_rate as f32 * max_secs).max(1.0) as usize) * usize::from(channels.max(1));
    let buffer = Arc::new(Mutex::new(RecordingBuffer::new(capacity)));
    let cb_buffer = Arc::clone(&buffer);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = cb_buffer.lock() {
                    buf.extend(data);
                }
            },
            |err: cpal::StreamError| {
                log::error!("capture: stream error: {err}");
            },
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    log::debug!("capture: session open ({sample_rate} Hz, {channels} ch)");

    Ok(CaptureSession {
        _stream: stream,
        buffer,
        sample_rate,
        channels,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// `AudioCapture` must be shareable behind `Arc<dyn Recorder>`.
    #[test]
    fn audio_capture_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AudioCapture>();
    }

    #[test]
    fn empty_handle_reports_empty() {
        let handle = RecordingHandle {
            wav: Vec::new(),
            path: PathBuf::from("capture.wav"),
            duration_secs: 0.0,
        };
        assert!(handle.is_empty());
    }

    #[test]
    fn non_empty_handle_reports_non_empty() {
        let handle = RecordingHandle {
            wav: vec![0_u8; 64],
            path: PathBuf::from("capture.wav"),
            duration_secs: 1.5,
        };
        assert!(!handle.is_empty());
    }

    #[test]
    fn nothing_recorded_display() {
        assert_eq!(
            CaptureError::NothingRecorded.to_string(),
            "no recording in progress"
        );
    }

    #[test]
    fn device_unavailable_carries_cause() {
        let e = CaptureError::DeviceUnavailable("denied".into());
        assert!(e.to_string().contains("denied"));
    }
}
