//! Pipeline coordinator — drives record → transcribe → generate →
//! synthesize → play for one turn at a time.
//!
//! [`AssistantPipeline`] owns the single active [`Turn`] and serializes
//! intents from the presentation layer. Intent methods return immediately;
//! the step chain runs on a spawned tokio task and reports through
//! published [`TurnSnapshot`]s.
//!
//! # Supersession
//!
//! A new intent never queues behind an unfinished turn — it replaces it.
//! There is no cancel token for in-flight network calls; instead every step
//! result is applied through [`PipelineInner::apply`], which checks the
//! originating [`TurnId`] against the active turn and silently drops
//! mismatches. Stale responses therefore cannot corrupt current state.
//!
//! # Failure policy
//!
//! Capture-acquisition failures leave the pipeline `Idle`;
//! transcription/generation failures end the turn `Errored` (keeping any
//! text already obtained); synthesis/playback failures are non-fatal — the
//! turn completes to `Idle` with its text result and the spoken-audio step
//! skipped. No step is retried.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::audio::{CaptureError, Player, Recorder, RecordingHandle};
use crate::inference::InferenceApi;

use super::state::{Turn, TurnError, TurnId, TurnSnapshot, TurnState};

// ---------------------------------------------------------------------------
// AssistantPipeline
// ---------------------------------------------------------------------------

/// The turn coordinator. Cheap to clone; all clones share one state machine.
///
/// Must be used from within a tokio runtime — intent methods spawn the
/// asynchronous step chain.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voice_assistant::audio::{AudioCapture, AudioPlayback};
/// use voice_assistant::config::{AppConfig, AppPaths};
/// use voice_assistant::inference::HfInferenceClient;
/// use voice_assistant::pipeline::AssistantPipeline;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let paths = AppPaths::new();
///
/// let client = Arc::new(HfInferenceClient::from_config(&config.inference));
/// let recorder = Arc::new(AudioCapture::new(&config.audio, paths.capture_file));
/// let player = Arc::new(AudioPlayback::new().unwrap());
///
/// let (pipeline, mut events) = AssistantPipeline::new(client, recorder, player);
///
/// pipeline.begin_recording();
/// // … user speaks …
/// pipeline.end_recording();
///
/// while let Some(snapshot) = events.recv().await {
///     println!("{}: {:?}", snapshot.state.label(), snapshot.response_text);
///     if snapshot.state.is_terminal() {
///         break;
///     }
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct AssistantPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    shared: Mutex<Shared>,
    client: Arc<dyn InferenceApi>,
    recorder: Arc<dyn Recorder>,
    player: Arc<dyn Player>,
    events: mpsc::UnboundedSender<TurnSnapshot>,
}

struct Shared {
    /// The active or last-completed turn. `None` until the first intent or
    /// after `reset`.
    turn: Option<Turn>,
    next_id: u64,
}

impl Shared {
    fn allocate(&mut self) -> TurnId {
        self.next_id += 1;
        TurnId(self.next_id)
    }
}

impl AssistantPipeline {
    /// Build a pipeline over the three collaborator seams.
    ///
    /// Returns the pipeline plus the snapshot channel the presentation
    /// layer consumes. Snapshots are emitted in transition order.
    pub fn new(
        client: Arc<dyn InferenceApi>,
        recorder: Arc<dyn Recorder>,
        player: Arc<dyn Player>,
    ) -> (Self, mpsc::UnboundedReceiver<TurnSnapshot>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(PipelineInner {
            shared: Mutex::new(Shared {
                turn: None,
                next_id: 0,
            }),
            client,
            recorder,
            player,
            events,
        });
        (Self { inner }, events_rx)
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Open a capture session for a new voice turn.
    ///
    /// Idempotent no-op while already `Recording` (returns the active turn's
    /// id). From any other state this supersedes the current turn, silencing
    /// any reply still playing. If the capture device cannot be acquired the
    /// pipeline stays `Idle` and the new turn carries
    /// [`TurnError::PermissionDenied`].
    pub fn begin_recording(&self) -> TurnId {
        let mut shared = self.inner.shared.lock().unwrap();

        if let Some(turn) = &shared.turn {
            if turn.state == TurnState::Recording {
                log::debug!("pipeline: begin_recording while recording — no-op");
                return turn.id;
            }
        }

        // A new intent supersedes anything still in flight.
        let id = shared.allocate();
        self.inner.player.stop();

        let turn = match self.inner.recorder.start() {
            Ok(()) => Turn::voice(id, TurnState::Recording),
            Err(e) => {
                log::warn!("pipeline: could not open capture session: {e}");
                let mut turn = Turn::voice(id, TurnState::Idle);
                turn.error = Some(TurnError::PermissionDenied(e.to_string()));
                turn
            }
        };
        self.inner.install(&mut shared, turn);
        id
    }

    /// Close the capture session and run the voice turn to completion.
    ///
    /// Valid only while `Recording`; called without an active recording it
    /// reports [`TurnError::NothingRecorded`] and the pipeline stays `Idle`.
    pub fn end_recording(&self) -> TurnId {
        let mut shared = self.inner.shared.lock().unwrap();

        let recording_id = shared
            .turn
            .as_ref()
            .and_then(|t| (t.state == TurnState::Recording).then_some(t.id));

        match recording_id {
            Some(id) => {
                // Close the session before releasing control so that a
                // follow-up begin_recording opens a fresh one.
                let stopped = self.inner.recorder.stop();

                if let Some(turn) = shared.turn.as_mut() {
                    turn.state = TurnState::Transcribing;
                    self.inner.publish(turn);
                }
                drop(shared);

                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move { run_voice_turn(inner, id, stopped).await });
                id
            }
            None => {
                if let Some(turn) = shared.turn.as_ref() {
                    if turn.state.is_busy() {
                        // Already past capture — a misplaced end is ignored.
                        log::debug!("pipeline: end_recording ignored (no capture open)");
                        return turn.id;
                    }
                }

                log::warn!("pipeline: end_recording without an active recording");
                let id = shared.allocate();
                let mut turn = Turn::voice(id, TurnState::Idle);
                turn.error = Some(TurnError::NothingRecorded);
                self.inner.install(&mut shared, turn);
                id
            }
        }
    }

    /// Start an image+question turn, entering `Generating` directly.
    ///
    /// An empty `question` is forwarded as-is; the backend defines its
    /// behaviour. Like [`begin_recording`](Self::begin_recording) this
    /// supersedes any in-flight turn; a live capture session is stopped and
    /// its audio discarded.
    pub fn submit_image(&self, image: Vec<u8>, question: String) -> TurnId {
        let mut shared = self.inner.shared.lock().unwrap();

        if shared
            .turn
            .as_ref()
            .is_some_and(|t| t.state == TurnState::Recording)
        {
            if let Err(e) = self.inner.recorder.stop() {
                log::warn!("pipeline: discarding capture session failed: {e}");
            }
        }
        self.inner.player.stop();

        let id = shared.allocate();
        self.inner
            .install(&mut shared, Turn::image_question(id, TurnState::Generating));
        drop(shared);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { run_image_turn(inner, id, image, question).await });
        id
    }

    /// Read-only snapshot of the active or last-completed turn.
    pub fn current_turn(&self) -> Option<TurnSnapshot> {
        self.inner
            .shared
            .lock()
            .unwrap()
            .turn
            .as_ref()
            .map(Turn::snapshot)
    }

    /// Force a clean `Idle`, discarding all turn data.
    ///
    /// Stops playback, discards any live capture session, and invalidates
    /// every in-flight step result.
    pub fn reset(&self) {
        let mut shared = self.inner.shared.lock().unwrap();

        if shared
            .turn
            .as_ref()
            .is_some_and(|t| t.state == TurnState::Recording)
        {
            let _ = self.inner.recorder.stop();
        }
        self.inner.player.stop();
        shared.turn = None;

        log::debug!("pipeline: reset to Idle");
    }
}

// ---------------------------------------------------------------------------
// Shared-state helpers
// ---------------------------------------------------------------------------

impl PipelineInner {
    fn publish(&self, turn: &Turn) {
        // The presentation layer may have detached; that is not an error.
        let _ = self.events.send(turn.snapshot());
    }

    /// Replace the active turn and publish its first snapshot.
    fn install(&self, shared: &mut Shared, turn: Turn) {
        self.publish(&turn);
        shared.turn = Some(turn);
    }

    /// Mutate the active turn iff it is still `id`, publishing the result.
    ///
    /// Returns `false` when the turn was superseded; the calling chain must
    /// abandon its remaining steps.
    fn apply(&self, id: TurnId, f: impl FnOnce(&mut Turn)) -> bool {
        let mut shared = self.shared.lock().unwrap();
        match shared.turn.as_mut() {
            Some(turn) if turn.id == id => {
                f(turn);
                self.publish(turn);
                true
            }
            _ => {
                log::debug!("pipeline: discarding stale result for {id}");
                false
            }
        }
    }

    /// Fatal step failure: move the turn to `Errored`, keeping partial text.
    fn fail(&self, id: TurnId, error: TurnError) {
        self.apply(id, |turn| {
            log::warn!("pipeline: {id} failed: {error}");
            turn.state = TurnState::Errored;
            turn.error = Some(error);
        });
    }

    /// Degraded completion: the turn ends `Idle` with its text result.
    fn degrade(&self, id: TurnId, error: Option<TurnError>) {
        self.apply(id, |turn| {
            turn.state = TurnState::Idle;
            turn.error = error;
        });
    }
}

// ---------------------------------------------------------------------------
// Step chains
// ---------------------------------------------------------------------------

/// Voice turn: handle → transcribe → generate → synthesize/play.
async fn run_voice_turn(
    inner: Arc<PipelineInner>,
    id: TurnId,
    stopped: Result<RecordingHandle, CaptureError>,
) {
    let handle = match stopped {
        Ok(handle) => handle,
        Err(CaptureError::NothingRecorded) => {
            inner.fail(id, TurnError::NothingRecorded);
            return;
        }
        Err(e) => {
            inner.fail(id, TurnError::Internal(e.to_string()));
            return;
        }
    };

    if handle.is_empty() {
        inner.fail(id, TurnError::EmptyCapture);
        return;
    }

    let transcript = match inner.client.transcribe(&handle.wav).await {
        Ok(text) => text,
        Err(e) => {
            inner.fail(id, TurnError::TranscriptionFailed(e.to_string()));
            return;
        }
    };
    log::debug!("pipeline: {id} transcript = {transcript:?}");

    if !inner.apply(id, |turn| {
        turn.transcript = Some(transcript.clone());
        turn.state = TurnState::Generating;
    }) {
        return;
    }

    let reply = match inner.client.generate(&transcript).await {
        Ok(text) => text,
        Err(e) => {
            inner.fail(id, TurnError::GenerationFailed(e.to_string()));
            return;
        }
    };
    log::debug!("pipeline: {id} reply = {reply:?}");

    if !inner.apply(id, |turn| {
        turn.response_text = Some(reply.clone());
        turn.state = TurnState::Synthesizing;
    }) {
        return;
    }

    speak(inner, id, reply).await;
}

/// Image turn: VQA → synthesize/play.
async fn run_image_turn(inner: Arc<PipelineInner>, id: TurnId, image: Vec<u8>, question: String) {
    let answer = match inner.client.answer_visual_question(&image, &question).await {
        Ok(text) => text,
        Err(e) => {
            inner.fail(id, TurnError::GenerationFailed(e.to_string()));
            return;
        }
    };
    log::debug!("pipeline: {id} answer = {answer:?}");

    if !inner.apply(id, |turn| {
        turn.response_text = Some(answer.clone());
        turn.state = TurnState::Synthesizing;
    }) {
        return;
    }

    speak(inner, id, answer).await;
}

/// Shared tail: synthesize the reply and play it. Synthesis and playback
/// failures are deliberately non-fatal — the text result already stands.
async fn speak(inner: Arc<PipelineInner>, id: TurnId, text: String) {
    let audio = match inner.client.synthesize(&text).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("pipeline: {id} synthesis failed ({e}); completing without audio");
            inner.degrade(id, Some(TurnError::SynthesisFailed(e.to_string())));
            return;
        }
    };

    if audio.is_empty() {
        // The endpoint opted out of audio; still a successful turn.
        log::debug!("pipeline: {id} synthesis returned no audio; skipping playback");
        inner.degrade(id, None);
        return;
    }

    if !inner.apply(id, |turn| {
        turn.response_audio = Some(audio.clone());
        turn.state = TurnState::Playing;
    }) {
        return;
    }

    match inner.player.play(audio).await {
        Ok(()) => {
            inner.apply(id, |turn| turn.state = TurnState::Idle);
        }
        Err(e) => {
            log::warn!("pipeline: {id} playback failed ({e}); text result stands");
            inner.degrade(id, Some(TurnError::PlaybackFailed(e.to_string())));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PlaybackError, RecordingHandle};
    use crate::inference::InferenceError;
    use crate::pipeline::state::InputModality;

    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Configurable inference stub; `Err(msg)` entries surface as transport
    /// failures.
    struct StubApi {
        transcript: Result<String, String>,
        reply: Result<String, String>,
        answer: Result<String, String>,
        speech: Result<Vec<u8>, String>,
        /// Slows `generate` down so a test can supersede mid-call.
        generate_delay: Option<Duration>,
        /// Questions seen by `answer_visual_question`.
        questions: Mutex<Vec<String>>,
    }

    impl StubApi {
        fn happy() -> Self {
            Self {
                transcript: Ok("turn on the lights".into()),
                reply: Ok("Sure, turning them on.".into()),
                answer: Ok("red".into()),
                speech: Ok(vec![1, 2, 3, 4]),
                generate_delay: None,
                questions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InferenceApi for StubApi {
        async fn transcribe(&self, _audio: &[u8]) -> Result<String, InferenceError> {
            self.transcript.clone().map_err(InferenceError::Request)
        }

        async fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
            if let Some(delay) = self.generate_delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map_err(InferenceError::Request)
        }

        async fn answer_visual_question(
            &self,
            _image: &[u8],
            question: &str,
        ) -> Result<String, InferenceError> {
            self.questions.lock().unwrap().push(question.to_string());
            self.answer.clone().map_err(InferenceError::Request)
        }

        async fn caption_image(&self, _image: &[u8]) -> Result<String, InferenceError> {
            Ok("a stub caption".into())
        }

        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, InferenceError> {
            self.speech.clone().map_err(InferenceError::Request)
        }
    }

    /// Recorder stub with real single-session semantics.
    struct StubRecorder {
        active: AtomicBool,
        fail_start: bool,
        duration_secs: f32,
    }

    impl StubRecorder {
        fn with_audio() -> Self {
            Self {
                active: AtomicBool::new(false),
                fail_start: false,
                duration_secs: 1.25,
            }
        }

        fn empty() -> Self {
            Self {
                duration_secs: 0.0,
                ..Self::with_audio()
            }
        }

        fn unavailable() -> Self {
            Self {
                fail_start: true,
                ..Self::with_audio()
            }
        }
    }

    impl Recorder for StubRecorder {
        fn start(&self) -> Result<(), CaptureError> {
            if self.fail_start {
                return Err(CaptureError::DeviceUnavailable("denied".into()));
            }
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<RecordingHandle, CaptureError> {
            if !self.active.swap(false, Ordering::SeqCst) {
                return Err(CaptureError::NothingRecorded);
            }
            Ok(RecordingHandle {
                wav: vec![0_u8; 64],
                path: PathBuf::from("capture.wav"),
                duration_secs: self.duration_secs,
            })
        }
    }

    /// Player stub recording every submission.
    struct StubPlayer {
        plays: Mutex<Vec<usize>>,
        stops: AtomicUsize,
        fail: bool,
    }

    impl StubPlayer {
        fn ok() -> Self {
            Self {
                plays: Mutex::new(Vec::new()),
                stops: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl Player for StubPlayer {
        async fn play(&self, bytes: Vec<u8>) -> Result<(), PlaybackError> {
            if self.fail {
                return Err(PlaybackError::Decode("bad container".into()));
            }
            self.plays.lock().unwrap().push(bytes.len());
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Read events until `id` reaches a terminal state; returns that snapshot.
    async fn wait_terminal(
        events: &mut mpsc::UnboundedReceiver<TurnSnapshot>,
        id: TurnId,
    ) -> TurnSnapshot {
        loop {
            let snap = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out waiting for a terminal snapshot")
                .expect("event channel closed");
            if snap.id == id && snap.state.is_terminal() {
                return snap;
            }
        }
    }

    /// Read events until `id` reaches `state`.
    async fn wait_state(
        events: &mut mpsc::UnboundedReceiver<TurnSnapshot>,
        id: TurnId,
        state: TurnState,
    ) {
        loop {
            let snap = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out waiting for state")
                .expect("event channel closed");
            if snap.id == id && snap.state == state {
                return;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// Full voice scenario: the turn ends Idle carrying transcript, reply
    /// text, and the synthesized audio was played.
    #[tokio::test]
    async fn full_voice_turn_reaches_idle_with_results() {
        let player = Arc::new(StubPlayer::ok());
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::with_audio()),
            Arc::clone(&player) as Arc<dyn Player>,
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        let end = wait_terminal(&mut events, id).await;

        assert_eq!(end.state, TurnState::Idle);
        assert_eq!(end.transcript.as_deref(), Some("turn on the lights"));
        assert_eq!(end.response_text.as_deref(), Some("Sure, turning them on."));
        assert!(end.error.is_none());
        assert_eq!(player.plays.lock().unwrap().as_slice(), &[4]);
    }

    /// Snapshots for one turn arrive in transition order.
    #[tokio::test]
    async fn snapshots_follow_transition_order() {
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        let id = pipeline.begin_recording();
        assert_eq!(pipeline.end_recording(), id);

        let mut states = Vec::new();
        loop {
            let snap = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out")
                .expect("event channel closed");
            if snap.id != id {
                continue;
            }
            states.push(snap.state);
            if snap.state.is_terminal() {
                break;
            }
        }

        assert_eq!(
            states,
            vec![
                TurnState::Recording,
                TurnState::Transcribing,
                TurnState::Generating,
                TurnState::Synthesizing,
                TurnState::Playing,
                TurnState::Idle,
            ]
        );
    }

    /// `end_recording` without a prior `begin_recording` reports
    /// NothingRecorded and the pipeline stays Idle.
    #[tokio::test]
    async fn end_without_begin_reports_nothing_recorded() {
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        let id = pipeline.end_recording();
        let snap = wait_terminal(&mut events, id).await;

        assert_eq!(snap.state, TurnState::Idle);
        assert_eq!(snap.error, Some(TurnError::NothingRecorded));
        assert_eq!(
            pipeline.current_turn().map(|t| t.state),
            Some(TurnState::Idle)
        );
    }

    /// `begin_recording` while already recording is an idempotent no-op.
    #[tokio::test]
    async fn begin_is_idempotent_while_recording() {
        let (pipeline, _events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        let first = pipeline.begin_recording();
        let second = pipeline.begin_recording();

        assert_eq!(first, second);
        assert_eq!(
            pipeline.current_turn().map(|t| t.state),
            Some(TurnState::Recording)
        );
    }

    /// An unacquirable capture device leaves the pipeline Idle with
    /// PermissionDenied attached to the turn.
    #[tokio::test]
    async fn capture_unavailable_stays_idle_with_permission_denied() {
        let (pipeline, _events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::unavailable()),
            Arc::new(StubPlayer::ok()),
        );

        pipeline.begin_recording();
        let snap = pipeline.current_turn().expect("turn installed");

        assert_eq!(snap.state, TurnState::Idle);
        assert!(matches!(snap.error, Some(TurnError::PermissionDenied(_))));
    }

    /// A session that captured no audio ends the turn Errored(EmptyCapture).
    #[tokio::test]
    async fn empty_capture_reaches_errored() {
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::empty()),
            Arc::new(StubPlayer::ok()),
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        let snap = wait_terminal(&mut events, id).await;

        assert_eq!(snap.state, TurnState::Errored);
        assert_eq!(snap.error, Some(TurnError::EmptyCapture));
    }

    /// Transcription failure ends the turn Errored with no transcript.
    #[tokio::test]
    async fn transcription_failure_reaches_errored() {
        let api = StubApi {
            transcript: Err("asr down".into()),
            ..StubApi::happy()
        };
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(api),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        let snap = wait_terminal(&mut events, id).await;

        assert_eq!(snap.state, TurnState::Errored);
        assert!(matches!(snap.error, Some(TurnError::TranscriptionFailed(_))));
        assert!(snap.transcript.is_none());
    }

    /// Generation failure ends the turn Errored but preserves the
    /// already-obtained transcript.
    #[tokio::test]
    async fn generation_failure_preserves_transcript() {
        let api = StubApi {
            reply: Err("model loading".into()),
            ..StubApi::happy()
        };
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(api),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        let snap = wait_terminal(&mut events, id).await;

        assert_eq!(snap.state, TurnState::Errored);
        assert!(matches!(snap.error, Some(TurnError::GenerationFailed(_))));
        assert_eq!(snap.transcript.as_deref(), Some("turn on the lights"));
    }

    /// Synthesis failure is non-fatal: the turn completes to Idle with its
    /// text result, SynthesisFailed attached, and no playback attempt.
    #[tokio::test]
    async fn synthesis_failure_degrades_without_playback() {
        let api = StubApi {
            speech: Err("tts down".into()),
            ..StubApi::happy()
        };
        let player = Arc::new(StubPlayer::ok());
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(api),
            Arc::new(StubRecorder::with_audio()),
            Arc::clone(&player) as Arc<dyn Player>,
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        let snap = wait_terminal(&mut events, id).await;

        assert_eq!(snap.state, TurnState::Idle);
        assert_eq!(snap.response_text.as_deref(), Some("Sure, turning them on."));
        assert!(matches!(snap.error, Some(TurnError::SynthesisFailed(_))));
        assert!(player.plays.lock().unwrap().is_empty());
    }

    /// Empty synthesized audio skips playback without raising an error.
    #[tokio::test]
    async fn empty_synthesis_completes_without_error() {
        let api = StubApi {
            speech: Ok(Vec::new()),
            ..StubApi::happy()
        };
        let player = Arc::new(StubPlayer::ok());
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(api),
            Arc::new(StubRecorder::with_audio()),
            Arc::clone(&player) as Arc<dyn Player>,
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        let snap = wait_terminal(&mut events, id).await;

        assert_eq!(snap.state, TurnState::Idle);
        assert!(snap.error.is_none());
        assert!(player.plays.lock().unwrap().is_empty());
    }

    /// Playback failure is non-fatal: the text result stands.
    #[tokio::test]
    async fn playback_failure_is_non_fatal() {
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::failing()),
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        let snap = wait_terminal(&mut events, id).await;

        assert_eq!(snap.state, TurnState::Idle);
        assert_eq!(snap.response_text.as_deref(), Some("Sure, turning them on."));
        assert!(matches!(snap.error, Some(TurnError::PlaybackFailed(_))));
    }

    /// Starting a new turn supersedes the previous one; the stale turn's
    /// late-arriving generation result never mutates current state.
    #[tokio::test]
    async fn supersession_discards_late_results() {
        let api = StubApi {
            generate_delay: Some(Duration::from_millis(150)),
            ..StubApi::happy()
        };
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(api),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        pipeline.begin_recording();
        let first = pipeline.end_recording();
        wait_state(&mut events, first, TurnState::Generating).await;

        // Supersede while the first turn's generate call is in flight.
        let second = pipeline.begin_recording();
        assert_ne!(first, second);

        // Let the stale generation result land and be discarded.
        tokio::time::sleep(Duration::from_millis(400)).await;

        let current = pipeline.current_turn().expect("turn installed");
        assert_eq!(current.id, second);
        assert_eq!(current.state, TurnState::Recording);
        assert!(current.response_text.is_none());

        // No post-supersession snapshot may exist for the first turn.
        while let Ok(snap) = events.try_recv() {
            if snap.id == first {
                assert!(
                    !matches!(
                        snap.state,
                        TurnState::Synthesizing | TurnState::Playing | TurnState::Idle
                    ),
                    "stale turn advanced after supersession: {:?}",
                    snap.state
                );
            }
        }
    }

    /// An image turn enters Generating directly and never passes through
    /// the capture states.
    #[tokio::test]
    async fn submit_image_skips_recording_states() {
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        let id = pipeline.submit_image(vec![9, 9, 9], "what color is this?".into());

        let mut states = Vec::new();
        loop {
            let snap = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out")
                .expect("event channel closed");
            if snap.id != id {
                continue;
            }
            states.push(snap.state);
            if snap.state.is_terminal() {
                assert_eq!(snap.modality, InputModality::ImageQuestion);
                assert_eq!(snap.response_text.as_deref(), Some("red"));
                assert!(snap.transcript.is_none());
                break;
            }
        }

        assert!(!states.contains(&TurnState::Recording));
        assert!(!states.contains(&TurnState::Transcribing));
        assert_eq!(states.first(), Some(&TurnState::Generating));
        assert_eq!(states.last(), Some(&TurnState::Idle));
    }

    /// An empty question is forwarded to the backend unchanged.
    #[tokio::test]
    async fn empty_question_is_forwarded_as_is() {
        let api = Arc::new(StubApi::happy());
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::clone(&api) as Arc<dyn InferenceApi>,
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        let id = pipeline.submit_image(vec![1], String::new());
        wait_terminal(&mut events, id).await;

        assert_eq!(api.questions.lock().unwrap().as_slice(), &[String::new()]);
    }

    /// `reset` discards all turn data and returns to a clean Idle.
    #[tokio::test]
    async fn reset_discards_turn_data() {
        let api = StubApi {
            transcript: Err("asr down".into()),
            ..StubApi::happy()
        };
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(api),
            Arc::new(StubRecorder::with_audio()),
            Arc::new(StubPlayer::ok()),
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        wait_terminal(&mut events, id).await;

        pipeline.reset();
        assert!(pipeline.current_turn().is_none());
    }

    /// A new intent silences the previous reply before recording starts.
    #[tokio::test]
    async fn new_intent_stops_previous_playback() {
        let player = Arc::new(StubPlayer::ok());
        let (pipeline, mut events) = AssistantPipeline::new(
            Arc::new(StubApi::happy()),
            Arc::new(StubRecorder::with_audio()),
            Arc::clone(&player) as Arc<dyn Player>,
        );

        pipeline.begin_recording();
        let id = pipeline.end_recording();
        wait_terminal(&mut events, id).await;

        pipeline.begin_recording();
        assert!(player.stops.load(Ordering::SeqCst) >= 1);
    }
}
