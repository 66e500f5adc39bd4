//! Error types for cia-recorder

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// Invalid or missing profile configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A frame could not be captured
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The encoder failed or could not be started
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stopped before any frame was captured
    #[error("Recording cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RecorderError>;
