//! Base trait for answer-generation providers

use async_trait::async_trait;
use mlfl_core::session::{GeneratedAnswer, GenerationRequest};
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// The retrieval + generation collaborator.
///
/// Receives the latest question with its windowed history and returns a whole
/// answer together with the sources it was grounded on.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Generate an answer
    async fn answer(&self, request: GenerationRequest) -> ProviderResult<GeneratedAnswer>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
