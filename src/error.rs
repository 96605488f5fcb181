//! Error types for capture sessions.

use thiserror::Error;

/// Everything that can end a `hear` call early.
#[derive(Error, Debug)]
pub enum HearError {
    #[error("Invalid capture parameters: {0}")]
    InvalidParams(String),

    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Could not install Ctrl+C handler: {0}")]
    Interrupt(String),

    #[error("No default input device available")]
    NoInputDevice,

    #[error("JACK was detected but the client could not be opened: {0}")]
    ProfessionalOpen(jack::Error),

    #[error("JACK error: {0}")]
    Jack(#[from] jack::Error),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Capture callback failed: {0}")]
    Callback(anyhow::Error),

    #[error("Capture body failed: {0}")]
    Body(anyhow::Error),
}

impl HearError {
    pub fn stream(context: &str, err: impl std::fmt::Display) -> Self {
        HearError::Stream(format!("{context}: {err}"))
    }
}

/// Result type alias for capture operations
pub type HearResult<T> = Result<T, HearError>;
