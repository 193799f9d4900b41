//! Turn records and the pipeline state machine vocabulary.
//!
//! A [`Turn`] is one user-to-assistant exchange. [`TurnState`] drives the
//! coordinator's state machine; the presentation layer observes it through
//! published [`TurnSnapshot`]s.
//!
//! [`TurnError`] is the full failure taxonomy. Failures are carried on the
//! Turn's `error` field and never thrown across the pipeline boundary.

use thiserror::Error;

// ---------------------------------------------------------------------------
// TurnId
// ---------------------------------------------------------------------------

/// Opaque, process-unique identifier for one [`Turn`].
///
/// Every in-flight step result is tagged with the id of the Turn that
/// started it; a result whose id no longer matches the active Turn is
/// discarded (supersession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(pub(crate) u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

/// States of the assistant pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──beginRecording──▶ Recording ──endRecording──▶ Transcribing
///      ──▶ Generating ──▶ Synthesizing ──▶ Playing ──▶ Idle
///
/// Idle ──submitImage──▶ Generating   (skips Recording/Transcribing)
///
/// any non-Idle state ──step failure──▶ Errored
/// Errored ──reset──▶ Idle
/// any state ──new intent──▶ superseded (fresh Turn)
/// ```
///
/// Synthesis and playback failures do **not** reach `Errored`: the Turn
/// completes to `Idle` with its text result (degraded completion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn in flight; waiting for an intent.
    Idle,

    /// Microphone session is open; audio is being captured.
    Recording,

    /// Capture closed; the speech-to-text call is in flight.
    Transcribing,

    /// Transcript (or image question) obtained; text generation in flight.
    Generating,

    /// Response text obtained; the text-to-speech call is in flight.
    Synthesizing,

    /// Synthesized audio is playing.
    Playing,

    /// A fatal step failure occurred. A new intent or `reset` leaves it.
    Errored,
}

impl TurnState {
    /// Returns `true` for the two resting states (`Idle`, `Errored`).
    ///
    /// The single-turn invariant is expressed through this predicate: at
    /// most one Turn is ever in a non-terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Idle | TurnState::Errored)
    }

    /// Returns `true` while the pipeline is actively working on a turn.
    pub fn is_busy(&self) -> bool {
        !self.is_terminal()
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            TurnState::Idle => "Idle",
            TurnState::Recording => "Recording",
            TurnState::Transcribing => "Transcribing",
            TurnState::Generating => "Generating",
            TurnState::Synthesizing => "Synthesizing",
            TurnState::Playing => "Playing",
            TurnState::Errored => "Error",
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        TurnState::Idle
    }
}

// ---------------------------------------------------------------------------
// InputModality
// ---------------------------------------------------------------------------

/// How a turn entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputModality {
    /// Spoken utterance: record → transcribe → generate.
    Voice,
    /// Image plus question: straight to visual question answering.
    ImageQuestion,
}

// ---------------------------------------------------------------------------
// TurnError
// ---------------------------------------------------------------------------

/// Everything that can go wrong during a turn.
///
/// Variants carry a human-readable cause so the presentation layer can
/// display them without knowing the failing subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// The capture device could not be acquired when recording began.
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    /// `end_recording` was called with no recording in progress.
    #[error("no recording in progress")]
    NothingRecorded,

    /// The capture session closed without producing any audio.
    #[error("recording contained no audio")]
    EmptyCapture,

    /// The speech-to-text call failed.
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// The text-generation (or VQA) call failed.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The text-to-speech call failed. Non-fatal: the Turn still completes
    /// with its text result.
    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Playback of the synthesized audio failed. Non-fatal.
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// Unexpected internal failure (e.g. a worker task died).
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// One user-to-assistant exchange, owned and mutated only by the pipeline.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Unique id; supersession is decided by comparing against it.
    pub id: TurnId,
    /// How this turn entered the pipeline.
    pub modality: InputModality,
    /// Speech-to-text result (voice turns only).
    pub transcript: Option<String>,
    /// Generated (or VQA) reply text.
    pub response_text: Option<String>,
    /// Synthesized reply audio.
    pub response_audio: Option<Vec<u8>>,
    /// Current state-machine position.
    pub state: TurnState,
    /// Failure record, if any step failed.
    pub error: Option<TurnError>,
}

impl Turn {
    /// Fresh voice turn in the given state.
    pub fn voice(id: TurnId, state: TurnState) -> Self {
        Self {
            id,
            modality: InputModality::Voice,
            transcript: None,
            response_text: None,
            response_audio: None,
            state,
            error: None,
        }
    }

    /// Fresh image+question turn in the given state.
    pub fn image_question(id: TurnId, state: TurnState) -> Self {
        Self {
            modality: InputModality::ImageQuestion,
            ..Self::voice(id, state)
        }
    }

    /// The published view of this turn: everything except the audio bytes.
    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            id: self.id,
            modality: self.modality,
            state: self.state,
            transcript: self.transcript.clone(),
            response_text: self.response_text.clone(),
            error: self.error.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// TurnSnapshot
// ---------------------------------------------------------------------------

/// Read-only view of a [`Turn`] published to the presentation layer.
///
/// Snapshots for one turn are delivered in transition order; the audio
/// buffer is deliberately excluded to keep cloning cheap.
#[derive(Debug, Clone)]
pub struct TurnSnapshot {
    pub id: TurnId,
    pub modality: InputModality,
    pub state: TurnState,
    pub transcript: Option<String>,
    pub response_text: Option<String>,
    pub error: Option<TurnError>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- TurnState predicates ---

    #[test]
    fn idle_and_errored_are_terminal() {
        assert!(TurnState::Idle.is_terminal());
        assert!(TurnState::Errored.is_terminal());
    }

    #[test]
    fn working_states_are_busy() {
        for state in [
            TurnState::Recording,
            TurnState::Transcribing,
            TurnState::Generating,
            TurnState::Synthesizing,
            TurnState::Playing,
        ] {
            assert!(state.is_busy(), "{state:?} should be busy");
            assert!(!state.is_terminal(), "{state:?} should not be terminal");
        }
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(TurnState::default(), TurnState::Idle);
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(TurnState::Idle.label(), "Idle");
        assert_eq!(TurnState::Recording.label(), "Recording");
        assert_eq!(TurnState::Transcribing.label(), "Transcribing");
        assert_eq!(TurnState::Generating.label(), "Generating");
        assert_eq!(TurnState::Synthesizing.label(), "Synthesizing");
        assert_eq!(TurnState::Playing.label(), "Playing");
        assert_eq!(TurnState::Errored.label(), "Error");
    }

    // ---- Turn construction ---

    #[test]
    fn voice_turn_starts_clean() {
        let turn = Turn::voice(TurnId(1), TurnState::Recording);
        assert_eq!(turn.modality, InputModality::Voice);
        assert_eq!(turn.state, TurnState::Recording);
        assert!(turn.transcript.is_none());
        assert!(turn.response_text.is_none());
        assert!(turn.response_audio.is_none());
        assert!(turn.error.is_none());
    }

    #[test]
    fn image_turn_has_image_modality() {
        let turn = Turn::image_question(TurnId(2), TurnState::Generating);
        assert_eq!(turn.modality, InputModality::ImageQuestion);
        assert_eq!(turn.state, TurnState::Generating);
    }

    // ---- Snapshot ---

    #[test]
    fn snapshot_mirrors_turn_fields() {
        let mut turn = Turn::voice(TurnId(3), TurnState::Synthesizing);
        turn.transcript = Some("hello".into());
        turn.response_text = Some("hi there".into());
        turn.response_audio = Some(vec![0_u8; 1024]);

        let snap = turn.snapshot();
        assert_eq!(snap.id, turn.id);
        assert_eq!(snap.state, TurnState::Synthesizing);
        assert_eq!(snap.transcript.as_deref(), Some("hello"));
        assert_eq!(snap.response_text.as_deref(), Some("hi there"));
        assert!(snap.error.is_none());
    }

    #[test]
    fn turn_id_display_is_prefixed() {
        assert_eq!(TurnId(7).to_string(), "turn-7");
    }

    #[test]
    fn turn_error_display_messages() {
        assert_eq!(
            TurnError::NothingRecorded.to_string(),
            "no recording in progress"
        );
        assert_eq!(
            TurnError::EmptyCapture.to_string(),
            "recording contained no audio"
        );
        assert!(TurnError::TranscriptionFailed("503".into())
            .to_string()
            .contains("503"));
    }
}
