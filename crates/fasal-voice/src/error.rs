//! Error types for the dialogue orchestrator.

use thiserror::Error;

/// Result type alias for dialogue operations.
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while orchestrating a setup dialogue.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Recognition failed ({kind}): {detail}")]
    Recognition {
        kind: crate::stt::RecognitionErrorKind,
        detail: String,
    },

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Slot '{0}' is already filled")]
    SlotAlreadyFilled(&'static str),

    #[error("Session already stopped")]
    SessionStopped,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Shortcut for a recognition failure with the given kind.
    pub fn recognition(kind: crate::stt::RecognitionErrorKind, detail: impl Into<String>) -> Self {
        Self::Recognition {
            kind,
            detail: detail.into(),
        }
    }
}
