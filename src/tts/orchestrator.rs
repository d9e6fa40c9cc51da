//! Playback state machine over a [`SynthesisEngine`].
//!
//! Phase transitions to `Speaking` are confirmed, never optimistic: a
//! dispatched `speak` leaves the phase at `Idle` until the engine's
//! `Started` event arrives, so the state never claims playback the engine
//! silently failed to begin. Engine events are consumed by a single pump
//! task from a FIFO channel, so a `Finished` can never overtake the
//! `Started` of the same utterance.
//!
//! When an utterance finishes before the last page, the orchestrator
//! emits one [`PageRequest`] for the next page on the shared page
//! channel; the page-turn collaborator then reads it back in through the
//! normal page-changed path, closing the auto-advance loop.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::{SynthesisCommandError, SynthesisEngine, SynthesisEvent, Utterance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackPhase {
    Idle,
    Speaking,
    Paused,
}

/// Word-level position inside the current utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechProgress {
    pub text: String,
    pub position: usize,
}

/// Auto-advance request emitted on the page channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    pub rate: f32,
    pub pitch: f32,
    pub progress: Option<SpeechProgress>,
}

#[derive(Debug, Error)]
pub enum TtsCommandError {
    /// `speak` was issued while an utterance is in progress; callers must
    /// stop first, the engine does not implicitly cancel.
    #[error("speech is already in progress")]
    NotIdle,

    #[error(transparent)]
    Engine(#[from] SynthesisCommandError),
}

struct PlaybackState {
    phase: PlaybackPhase,
    rate: f32,
    pitch: f32,
    /// `(current, total)` page context guarding auto-advance; `None`
    /// until the reader reports it.
    page: Option<(u32, u32)>,
    progress: Option<SpeechProgress>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            rate: 0.5,
            pitch: 1.0,
            page: None,
            progress: None,
        }
    }
}

pub struct TtsOrchestrator {
    engine: Arc<dyn SynthesisEngine>,
    state: Arc<Mutex<PlaybackState>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl TtsOrchestrator {
    /// Spawns the event pump and returns the orchestrator together with
    /// the sender the engine adapter delivers [`SynthesisEvent`]s on.
    /// Events are processed strictly in arrival order.
    pub fn new(
        engine: Arc<dyn SynthesisEngine>,
        page_tx: mpsc::Sender<PageRequest>,
    ) -> (Self, mpsc::Sender<SynthesisEvent>) {
        let state = Arc::new(Mutex::new(PlaybackState::default()));
        let (event_tx, event_rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(event_pump(
            state.clone(),
            page_tx,
            event_rx,
            cancel.clone(),
        ));

        (
            Self {
                engine,
                state: state.clone(),
                pump: Mutex::new(Some(pump)),
                cancel,
            },
            event_tx,
        )
    }

    /// Dispatches an utterance. Accepted only while `Idle`; the phase
    /// stays `Idle` until the engine confirms with `Started`.
    pub async fn speak(&self, text: &str) -> Result<(), TtsCommandError> {
        let guard = self.state.lock().await;
        if guard.phase != PlaybackPhase::Idle {
            return Err(TtsCommandError::NotIdle);
        }

        let utterance = Utterance {
            text: text.to_string(),
            rate: guard.rate,
            pitch: guard.pitch,
        };
        // Hold the lock across the dispatch so a second speak cannot slip
        // past the Idle guard, and do not touch the phase on success.
        self.engine.speak(utterance).await?;
        Ok(())
    }

    /// Pauses playback. Silent no-op unless `Speaking`; engine rejection
    /// surfaces and leaves the phase unchanged.
    pub async fn pause(&self) -> Result<(), SynthesisCommandError> {
        let mut guard = self.state.lock().await;
        if guard.phase != PlaybackPhase::Speaking {
            return Ok(());
        }
        self.engine.pause().await?;
        guard.phase = PlaybackPhase::Paused;
        Ok(())
    }

    /// Resumes playback. Silent no-op unless `Paused`.
    pub async fn resume(&self) -> Result<(), SynthesisCommandError> {
        let mut guard = self.state.lock().await;
        if guard.phase != PlaybackPhase::Paused {
            return Ok(());
        }
        self.engine.resume().await?;
        guard.phase = PlaybackPhase::Speaking;
        Ok(())
    }

    /// Stops playback. On engine acceptance the phase drops to `Idle`
    /// immediately rather than waiting for the `Cancelled` ack, so an
    /// engine that never delivers it cannot wedge the state; the late ack
    /// is an idempotent no-op.
    pub async fn stop(&self) -> Result<(), SynthesisCommandError> {
        let mut guard = self.state.lock().await;
        if guard.phase == PlaybackPhase::Idle {
            return Ok(());
        }
        self.engine.stop().await?;
        guard.phase = PlaybackPhase::Idle;
        guard.progress = None;
        Ok(())
    }

    /// Updates the speech rate, clamped to `[0.0, 1.0]`. Accepted in any
    /// phase; takes effect on the next `speak`.
    pub async fn set_rate(&self, rate: f32) -> Result<(), SynthesisCommandError> {
        let clamped = rate.clamp(0.0, 1.0);
        let mut guard = self.state.lock().await;
        self.engine.set_rate(clamped).await?;
        guard.rate = clamped;
        Ok(())
    }

    /// Updates the voice pitch, clamped to `[0.5, 2.0]`. Accepted in any
    /// phase; takes effect on the next `speak`.
    pub async fn set_pitch(&self, pitch: f32) -> Result<(), SynthesisCommandError> {
        let clamped = pitch.clamp(0.5, 2.0);
        let mut guard = self.state.lock().await;
        self.engine.set_pitch(clamped).await?;
        guard.pitch = clamped;
        Ok(())
    }

    /// Keeps the auto-advance guard current with the reader's position.
    pub async fn set_page_context(&self, current: u32, total: u32) {
        self.state.lock().await.page = Some((current, total));
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let guard = self.state.lock().await;
        PlaybackSnapshot {
            phase: guard.phase,
            rate: guard.rate,
            pitch: guard.pitch,
            progress: guard.progress.clone(),
        }
    }

    /// Cancels and joins the event pump.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.pump.lock().await.take() {
            if let Err(err) = handle.await {
                warn!("tts event pump failed to join: {err}");
            }
        }
    }
}

async fn event_pump(
    state: Arc<Mutex<PlaybackState>>,
    page_tx: mpsc::Sender<PageRequest>,
    mut events: mpsc::Receiver<SynthesisEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => apply_event(&state, &page_tx, event).await,
                None => break,
            },
        }
    }
    info!("tts event pump shutting down");
}

async fn apply_event(
    state: &Mutex<PlaybackState>,
    page_tx: &mpsc::Sender<PageRequest>,
    event: SynthesisEvent,
) {
    let mut guard = state.lock().await;
    match event {
        SynthesisEvent::Started => {
            guard.phase = PlaybackPhase::Speaking;
            guard.progress = None;
        }
        SynthesisEvent::Finished => {
            let was_speaking = guard.phase == PlaybackPhase::Speaking;
            guard.phase = PlaybackPhase::Idle;
            guard.progress = None;

            // A finish while paused is a terminal resync only: the engine
            // may have flushed its queue on pause, and advancing past a
            // page the reader never heard would skip content.
            if was_speaking {
                if let Some((current, total)) = guard.page {
                    if current < total {
                        let request = PageRequest { page: current + 1 };
                        drop(guard);
                        if page_tx.send(request).await.is_err() {
                            warn!("page request channel closed, dropping auto-advance");
                        }
                        return;
                    }
                }
            }
        }
        SynthesisEvent::Progress { text, position } => {
            if guard.phase == PlaybackPhase::Speaking {
                guard.progress = Some(SpeechProgress { text, position });
            }
        }
        SynthesisEvent::Cancelled => {
            guard.phase = PlaybackPhase::Idle;
            guard.progress = None;
        }
        SynthesisEvent::Error(message) => {
            warn!("synthesis engine reported an error: {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::engine::mock::MockSynthesisEngine;
    use std::time::Duration;

    struct Rig {
        orchestrator: TtsOrchestrator,
        engine: Arc<MockSynthesisEngine>,
        events: mpsc::Sender<SynthesisEvent>,
        pages: mpsc::Receiver<PageRequest>,
    }

    fn rig() -> Rig {
        let engine = Arc::new(MockSynthesisEngine::new());
        let (page_tx, pages) = mpsc::channel(8);
        let (orchestrator, events) = TtsOrchestrator::new(engine.clone(), page_tx);
        Rig {
            orchestrator,
            engine,
            events,
            pages,
        }
    }

    async fn wait_for_phase(orchestrator: &TtsOrchestrator, phase: PlaybackPhase) {
        for _ in 0..200 {
            if orchestrator.snapshot().await.phase == phase {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("phase never became {phase:?}");
    }

    #[tokio::test]
    async fn speak_does_not_claim_speaking_until_started_arrives() {
        let rig = rig();
        rig.orchestrator.speak("page text").await.unwrap();
        assert_eq!(rig.orchestrator.snapshot().await.phase, PlaybackPhase::Idle);

        rig.events.send(SynthesisEvent::Started).await.unwrap();
        wait_for_phase(&rig.orchestrator, PlaybackPhase::Speaking).await;
    }

    #[tokio::test]
    async fn speak_is_rejected_while_speaking() {
        let rig = rig();
        rig.orchestrator.speak("first").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        wait_for_phase(&rig.orchestrator, PlaybackPhase::Speaking).await;

        let err = rig.orchestrator.speak("second").await.unwrap_err();
        assert!(matches!(err, TtsCommandError::NotIdle));
        assert_eq!(
            rig.orchestrator.snapshot().await.phase,
            PlaybackPhase::Speaking
        );
    }

    #[tokio::test]
    async fn finish_before_the_last_page_requests_exactly_the_next_page() {
        let mut rig = rig();
        rig.orchestrator.set_page_context(3, 10).await;
        rig.orchestrator.speak("page three").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        rig.events.send(SynthesisEvent::Finished).await.unwrap();

        let request = rig.pages.recv().await.unwrap();
        assert_eq!(request, PageRequest { page: 4 });
        wait_for_phase(&rig.orchestrator, PlaybackPhase::Idle).await;
        assert!(rig.pages.try_recv().is_err());
    }

    #[tokio::test]
    async fn finish_on_the_last_page_goes_idle_without_advancing() {
        let mut rig = rig();
        rig.orchestrator.set_page_context(10, 10).await;
        rig.orchestrator.speak("last page").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        rig.events.send(SynthesisEvent::Finished).await.unwrap();

        wait_for_phase(&rig.orchestrator, PlaybackPhase::Idle).await;
        assert!(rig.pages.try_recv().is_err());
    }

    #[tokio::test]
    async fn finish_without_page_context_never_advances() {
        let mut rig = rig();
        rig.orchestrator.speak("text").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        rig.events.send(SynthesisEvent::Finished).await.unwrap();

        wait_for_phase(&rig.orchestrator, PlaybackPhase::Idle).await;
        assert!(rig.pages.try_recv().is_err());
    }

    #[tokio::test]
    async fn finish_while_paused_resyncs_to_idle_without_advancing() {
        let mut rig = rig();
        rig.orchestrator.set_page_context(3, 10).await;
        rig.orchestrator.speak("text").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        wait_for_phase(&rig.orchestrator, PlaybackPhase::Speaking).await;

        rig.orchestrator.pause().await.unwrap();
        rig.events.send(SynthesisEvent::Finished).await.unwrap();

        wait_for_phase(&rig.orchestrator, PlaybackPhase::Idle).await;
        assert!(rig.pages.try_recv().is_err());
    }

    #[tokio::test]
    async fn pause_and_resume_guard_their_phases() {
        let rig = rig();
        // Pause while idle is a silent no-op that never reaches the engine.
        rig.orchestrator.pause().await.unwrap();
        assert!(rig.engine.commands().is_empty());

        rig.orchestrator.speak("text").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        wait_for_phase(&rig.orchestrator, PlaybackPhase::Speaking).await;

        // Resume while speaking is a no-op.
        rig.orchestrator.resume().await.unwrap();
        assert_eq!(
            rig.orchestrator.snapshot().await.phase,
            PlaybackPhase::Speaking
        );

        rig.orchestrator.pause().await.unwrap();
        assert_eq!(
            rig.orchestrator.snapshot().await.phase,
            PlaybackPhase::Paused
        );

        rig.orchestrator.resume().await.unwrap();
        assert_eq!(
            rig.orchestrator.snapshot().await.phase,
            PlaybackPhase::Speaking
        );
    }

    #[tokio::test]
    async fn stop_reaches_idle_without_waiting_for_the_cancel_ack() {
        let rig = rig();
        rig.orchestrator.speak("text").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        wait_for_phase(&rig.orchestrator, PlaybackPhase::Speaking).await;

        rig.orchestrator.stop().await.unwrap();
        assert_eq!(rig.orchestrator.snapshot().await.phase, PlaybackPhase::Idle);

        // The late ack is an idempotent no-op.
        rig.events.send(SynthesisEvent::Cancelled).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(rig.orchestrator.snapshot().await.phase, PlaybackPhase::Idle);
    }

    #[tokio::test]
    async fn engine_rejection_surfaces_and_leaves_the_phase_unchanged() {
        let rig = rig();
        rig.orchestrator.speak("text").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        wait_for_phase(&rig.orchestrator, PlaybackPhase::Speaking).await;

        rig.engine.reject("pause");
        let err = rig.orchestrator.pause().await.unwrap_err();
        assert!(matches!(err, SynthesisCommandError::Rejected(_)));
        assert_eq!(
            rig.orchestrator.snapshot().await.phase,
            PlaybackPhase::Speaking
        );
    }

    #[tokio::test]
    async fn rate_and_pitch_clamp_and_apply_to_the_next_utterance() {
        let rig = rig();
        rig.orchestrator.set_rate(1.7).await.unwrap();
        rig.orchestrator.set_pitch(0.1).await.unwrap();

        let snapshot = rig.orchestrator.snapshot().await;
        assert_eq!(snapshot.rate, 1.0);
        assert_eq!(snapshot.pitch, 0.5);
    }

    #[tokio::test]
    async fn progress_events_surface_in_the_snapshot() {
        let rig = rig();
        rig.orchestrator.speak("a few words").await.unwrap();
        rig.events.send(SynthesisEvent::Started).await.unwrap();
        rig.events
            .send(SynthesisEvent::Progress {
                text: "few".into(),
                position: 2,
            })
            .await
            .unwrap();

        wait_for_phase(&rig.orchestrator, PlaybackPhase::Speaking).await;
        for _ in 0..200 {
            if rig.orchestrator.snapshot().await.progress.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let progress = rig.orchestrator.snapshot().await.progress.unwrap();
        assert_eq!(progress.text, "few");
        assert_eq!(progress.position, 2);
    }

    #[tokio::test]
    async fn shutdown_joins_the_pump() {
        let rig = rig();
        rig.orchestrator.shutdown().await;
        // Events after shutdown go nowhere but must not panic senders
        // that still hold the channel.
        let _ = rig.events.send(SynthesisEvent::Started).await;
    }
}
