//! Error types for mlfl

use thiserror::Error;

/// The main error type for mlfl operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Export requested on a session without messages
    #[error("Nothing to export: the conversation is empty")]
    EmptyTranscript,

    /// A transcript document could not be parsed back
    #[error("Transcript parse error at line {line}: {reason}")]
    TranscriptParse { line: usize, reason: String },

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for mlfl operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
