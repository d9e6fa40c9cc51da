//! Synthesis engine seam.
//!
//! [`SynthesisEngine`] is the command surface the orchestrator drives; it
//! is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SynthesisEngine>`. The engine acknowledges commands by
//! returning, and reports actual playback transitions asynchronously as
//! [`SynthesisEvent`]s; the orchestrator never assumes a command took
//! effect until the matching event arrives.

use async_trait::async_trait;
use thiserror::Error;

/// One unit of speech handed to the engine, carrying the rate and pitch
/// it should be rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Speech rate in `[0.0, 1.0]`.
    pub rate: f32,
    /// Voice pitch in `[0.5, 2.0]`.
    pub pitch: f32,
}

/// Notifications emitted by the engine, delivered to the orchestrator in
/// arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    /// The utterance actually started playing.
    Started,
    /// The utterance played to completion.
    Finished,
    /// Word-level progress within the current utterance.
    Progress { text: String, position: usize },
    /// Playback was cancelled (by a stop command or externally).
    Cancelled,
    /// The engine hit an error mid-utterance.
    Error(String),
}

/// The engine rejected a command.
#[derive(Debug, Clone, Error)]
pub enum SynthesisCommandError {
    #[error("synthesis engine rejected the command: {0}")]
    Rejected(String),

    #[error("synthesis engine unavailable: {0}")]
    Unavailable(String),
}

/// Object-safe, thread-safe command surface for speech synthesis.
///
/// Returning `Ok` means the engine accepted the command, not that it took
/// effect; the effect is confirmed by a later [`SynthesisEvent`].
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    async fn speak(&self, utterance: Utterance) -> Result<(), SynthesisCommandError>;
    async fn stop(&self) -> Result<(), SynthesisCommandError>;
    async fn pause(&self) -> Result<(), SynthesisCommandError>;
    async fn resume(&self) -> Result<(), SynthesisCommandError>;
    async fn set_rate(&self, rate: f32) -> Result<(), SynthesisCommandError>;
    async fn set_pitch(&self, pitch: f32) -> Result<(), SynthesisCommandError>;
}

// Compile-time assertion: Box<dyn SynthesisEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SynthesisEngine>) {}
};


#[cfg(test)]
mod tests {
    use super::mock::MockSynthesisEngine;
    use super::*;

    #[tokio::test]
    async fn mock_records_accepted_commands() {
        let engine = MockSynthesisEngine::new();
        engine
            .speak(Utterance {
                text: "hello".into(),
                rate: 0.5,
                pitch: 1.0,
            })
            .await
            .unwrap();
        engine.stop().await.unwrap();
        assert_eq!(engine.commands(), vec!["speak", "stop"]);
    }

    #[tokio::test]
    async fn mock_rejects_configured_commands() {
        let engine = MockSynthesisEngine::new();
        engine.reject("pause");
        let err = engine.pause().await.unwrap_err();
        assert!(matches!(err, SynthesisCommandError::Rejected(_)));
        assert!(engine.commands().is_empty());
    }

    #[tokio::test]
    async fn box_dyn_engine_compiles() {
        // If this test compiles, the trait is object-safe.
        let engine: Box<dyn SynthesisEngine> = Box::new(MockSynthesisEngine::new());
        let _ = engine.stop().await;
    }
}
