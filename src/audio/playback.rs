//! Speaker playback via `rodio`.
//!
//! [`AudioPlayback`] implements the [`Player`] seam: `play` decodes a byte
//! buffer (WAV/MP3/FLAC — whatever the synthesis endpoint returns) and plays
//! it on the default output device, resolving when playback finishes or is
//! superseded. A second `play` preempts the first — last submission wins.
//! `stop` halts playback immediately.
//!
//! `rodio::OutputStream` is not `Send`, so the device objects live on a
//! dedicated worker thread; [`AudioPlayback`] holds only the command channel.

use std::io::Cursor;
use std::sync::mpsc;
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink, Source};
use thiserror::Error;
use tokio::sync::oneshot;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or driving playback.
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    /// The output device could not be acquired.
    #[error("audio output unavailable: {0}")]
    DeviceUnavailable(String),

    /// The submitted bytes are not a decodable audio container.
    #[error("could not decode audio for playback: {0}")]
    Decode(String),

    /// The playback worker thread has terminated.
    #[error("playback worker thread terminated")]
    WorkerGone,
}

// ---------------------------------------------------------------------------
// Player trait
// ---------------------------------------------------------------------------

/// Thread-safe interface for audio playback.
///
/// # Contract
///
/// - `play` resolves once the submitted audio has finished playing, or
///   earlier when it was preempted by a later `play`/`stop`. Preemption is
///   not an error.
/// - `stop` returns immediately; it never blocks on the device.
#[async_trait]
pub trait Player: Send + Sync {
    /// Submit `bytes` for playback, preempting anything currently playing.
    async fn play(&self, bytes: Vec<u8>) -> Result<(), PlaybackError>;

    /// Halt playback immediately.
    fn stop(&self);
}

// ---------------------------------------------------------------------------
// Worker protocol
// ---------------------------------------------------------------------------

enum WorkerCommand {
    Play {
        bytes: Vec<u8>,
        done: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Stop,
}

/// How often the worker polls the sink for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ---------------------------------------------------------------------------
// AudioPlayback
// ---------------------------------------------------------------------------

/// Production [`Player`] backed by the system default output device.
pub struct AudioPlayback {
    commands: mpsc::Sender<WorkerCommand>,
}

impl AudioPlayback {
    /// Create the player and spawn its worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::DeviceUnavailable`] when no output device
    /// can be acquired.
    pub fn new() -> Result<Self, PlaybackError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("audio-playback".into())
            .spawn(move || playback_worker(rx, ready_tx))
            .expect("failed to spawn audio-playback thread");

        ready_rx.recv().map_err(|_| PlaybackError::WorkerGone)??;
        Ok(Self { commands: tx })
    }
}

#[async_trait]
impl Player for AudioPlayback {
    async fn play(&self, bytes: Vec<u8>) -> Result<(), PlaybackError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.commands
            .send(WorkerCommand::Play {
                bytes,
                done: done_tx,
            })
            .map_err(|_| PlaybackError::WorkerGone)?;
        done_rx.await.map_err(|_| PlaybackError::WorkerGone)?
    }

    fn stop(&self) {
        let _ = self.commands.send(WorkerCommand::Stop);
    }
}

// ---------------------------------------------------------------------------
// Worker thread
// ---------------------------------------------------------------------------

type PendingDone = oneshot::Sender<Result<(), PlaybackError>>;

fn playback_worker(
    rx: mpsc::Receiver<WorkerCommand>,
    ready: mpsc::Sender<Result<(), PlaybackError>>,
) {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(PlaybackError::DeviceUnavailable(e.to_string())));
            return;
        }
    };
    // Keep the stream alive for the lifetime of the worker.
    let _stream = stream;
    let _ = ready.send(Ok(()));

    // The sink currently playing, paired with its completion sender. A fresh
    // sink per submission keeps preemption clean: dropping the old sink
    // silences it regardless of its internal state.
    let mut current: Option<(Sink, PendingDone)> = None;

    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(WorkerCommand::Play { bytes, done }) => {
                if let Some((old, pending)) = current.take() {
                    old.stop();
                    // Preempted playback counts as finished, not failed.
                    let _ = pending.send(Ok(()));
                }

                let source = match Decoder::new(Cursor::new(bytes)) {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = done.send(Err(PlaybackError::Decode(e.to_string())));
                        continue;
                    }
                };

                match Sink::try_new(&handle) {
                    Ok(sink) => {
                        sink.append(source.convert_samples::<f32>());
                        current = Some((sink, done));
                    }
                    Err(e) => {
                        let _ = done.send(Err(PlaybackError::DeviceUnavailable(e.to_string())));
                    }
                }
            }
            Ok(WorkerCommand::Stop) => {
                if let Some((sink, pending)) = current.take() {
                    sink.stop();
                    let _ = pending.send(Ok(()));
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let finished = current.as_ref().is_some_and(|(sink, _)| sink.empty());
                if finished {
                    if let Some((_, pending)) = current.take() {
                        let _ = pending.send(Ok(()));
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                if let Some((sink, pending)) = current.take() {
                    sink.stop();
                    let _ = pending.send(Ok(()));
                }
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
