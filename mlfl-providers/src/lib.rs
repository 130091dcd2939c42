//! Answer-generation backends for mlfl
//!
//! The session layer never talks HTTP itself: it hands a [`GenerationRequest`]
//! to an [`AnswerProvider`] and feeds the result back into the session.
//!
//! [`GenerationRequest`]: mlfl_core::session::GenerationRequest

pub mod backend;
pub mod base;

pub use backend::BackendClient;
pub use base::{AnswerProvider, ProviderError, ProviderResult};
