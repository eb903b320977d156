//! # FasalVaani Voice — setup dialogue orchestration
//!
//! Walks a farmer through the spoken setup dialogue (language → name →
//! location consent → location → field area) and hands the collected profile
//! to the crop-loss analysis consumer. Half-duplex: exactly one of
//! {listening, speaking} is active at any instant.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Dialog Orchestrator                       │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │  │ Dialog State │ → │     Turn     │ → │  Recognizer  │     │
//! │  │   Machine    │   │ Coordinator  │   │  Synthesizer │     │
//! │  └──────────────┘   └──────────────┘   └──────────────┘     │
//! │         ↓                                                    │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │  │     Slot     │   │   Language   │   │  Transcript  │     │
//! │  │  Extractors  │   │  Negotiator  │   │     Log      │     │
//! │  └──────────────┘   └──────────────┘   └──────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The turn coordinator is the only component allowed to start or stop a
//! speech channel; the state machine is pure over session state; the slot
//! extractors are pure over strings.

pub mod dialog;
pub mod error;
pub mod language;
pub mod orchestrator;
pub mod session;
pub mod slots;
pub mod steps;
pub mod stt;
pub mod tts;
pub mod turn;

pub use dialog::{AbortReason, Action, DialogEvent, DialogMachine};
pub use error::{VoiceError, VoiceResult};
pub use language::{Language, LanguageNegotiator};
pub use orchestrator::{
    AnalysisConsumer, ChannelConsumer, DialogOrchestrator, SessionOutcome, SessionReport,
    StopHandle,
};
pub use session::{DialogSession, SlotValues, Speaker, Transcript, TranscriptEntry};
pub use slots::Extraction;
pub use steps::{RetryPolicy, SlotName, StepId, StepSpec};
pub use stt::{
    RecognitionErrorKind, RecognitionEvent, Recognizer, ScriptedRecognizer, Utterance,
    UtteranceSource, WhisperGatewayRecognizer,
};
pub use tts::{
    NullPlayback, PlaybackSink, SilentSynthesizer, SpeechGatewaySynthesizer, Synthesizer,
};
pub use turn::{ChannelState, SpeakOutcome, TurnConfig, TurnCoordinator};
