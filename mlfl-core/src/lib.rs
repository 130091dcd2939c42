//! Core types for the MLFL legal-assistant client
//!
//! This crate holds the conversation session (message log, pending request,
//! citation table), transcript export, configuration and logging shared by
//! the other mlfl crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod transcript;
pub mod utils;

pub use error::{Error, Result};
pub use session::{
    ChatMessage, Citation, GeneratedAnswer, GenerationTicket, ResponseOutcome, Role,
    SessionEvent, SessionManager, SessionSnapshot, SubmitRejected,
};
pub use transcript::TranscriptFormat;
