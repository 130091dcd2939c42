//! Conversation session management
//!
//! A session is the ordered message log of one conversation, the citations
//! retrieved for each assistant answer, and the single in-flight request.

pub mod events;
pub mod manager;
pub mod store;

pub use events::SessionEvent;
pub use manager::{
    DiscardReason, GeneratedAnswer, GenerationRequest, GenerationTicket, HistoryTurn,
    ResponseOutcome, SessionManager, SessionSnapshot, SubmitRejected,
};
pub use store::{ChatMessage, Citation, CitationTable, Metadata, Role};
