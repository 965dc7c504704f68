use thiserror::Error;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Snapshot encoding failed: {0}")]
    Snapshot(#[from] image::ImageError),

    #[error("Audio recorder failed: {0}")]
    Recorder(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session has not been started")]
    SessionNotStarted,

    #[error("Session is closed")]
    SessionClosed,
}

impl EngineError {
    pub fn invalid_config(field: &str, reason: impl std::fmt::Display) -> Self {
        EngineError::InvalidConfig(format!("{}: {}", field, reason))
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
