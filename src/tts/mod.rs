pub mod engine;
mod orchestrator;

pub use engine::{SynthesisCommandError, SynthesisEngine, SynthesisEvent, Utterance};
pub use orchestrator::{
    PageRequest, PlaybackPhase, PlaybackSnapshot, SpeechProgress, TtsCommandError, TtsOrchestrator,
};
