//! Notifications published by the session manager

use super::store::Role;

/// Published after each state change so views can re-render
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A message was appended at `index`
    MessageAppended {
        index: usize,
        role: Role,
        generation: u64,
    },
    /// The pending request failed; the log is unchanged
    GenerationFailed { reason: String, generation: u64 },
    /// The session was reset; `generation` is the new generation
    Cleared { generation: u64 },
}
