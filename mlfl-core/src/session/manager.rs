//! Session manager: message log, pending request and citation correlation

use super::events::SessionEvent;
use super::store::{ChatMessage, Citation, CitationTable, Role};
use crate::transcript::{self, TranscriptFormat};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Number of prior messages sent along with a new question
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

const EVENT_CAPACITY: usize = 64;

/// Why a submission was ignored
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("message is empty")]
    EmptyText,
    #[error("a request is already pending")]
    RequestPending,
}

/// One prior turn sent as conversation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// Input for the answer-generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The question just submitted
    pub message: String,
    /// Prior turns, oldest first, limited to the history window
    pub history: Vec<HistoryTurn>,
}

/// Handed out by [`SessionManager::submit`]; its generation must be passed
/// back to [`SessionManager::on_response`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTicket {
    /// Session generation at dispatch time
    pub generation: u64,
    /// Log index of the submitted user message
    pub index: usize,
    pub request: GenerationRequest,
}

/// A completed answer from the generation backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl GeneratedAnswer {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citation(mut self, citation: Citation) -> Self {
        self.citations.push(citation);
        self
    }
}

/// Why a response was dropped without touching the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The session was cleared after the request was dispatched
    StaleGeneration { ticket: u64, current: u64 },
    /// No request is outstanding
    NotPending,
}

/// Result of delivering a response to the session
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Assistant message appended at `index`
    Appended { index: usize },
    /// Generation failed; the reason is meant for display
    Failed { reason: String },
    Discarded(DiscardReason),
}

/// Immutable copy of the session state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub citations: CitationTable,
    pub pending: bool,
    pub generation: u64,
}

impl SessionSnapshot {
    /// Render this snapshot as a transcript document
    pub fn export(&self, format: TranscriptFormat) -> crate::Result<String> {
        transcript::export(&self.messages, &self.citations, format)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<ChatMessage>,
    citations: CitationTable,
    pending: bool,
    generation: u64,
}

/// Owns the conversation of a single client.
///
/// All mutations go through one lock, so `submit`, `on_response` and `clear`
/// are atomic with respect to each other even when driven from several tasks.
/// The generation call itself happens outside the manager.
pub struct SessionManager {
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    history_window: usize,
}

impl SessionManager {
    /// Create an empty session sending at most `history_window` prior
    /// messages as context
    pub fn new(history_window: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(SessionState::default()),
            events,
            history_window,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Append a user message and mark a request pending.
    ///
    /// Empty text and submissions while a request is pending are rejected
    /// without touching the log.
    pub fn submit(&self, text: &str) -> Result<GenerationTicket, SubmitRejected> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return Err(SubmitRejected::EmptyText);
        }

        let ticket = {
            let mut state = self.state.lock();
            if state.pending {
                debug!("Ignoring submission while a request is pending");
                return Err(SubmitRejected::RequestPending);
            }

            let start = state.messages.len().saturating_sub(self.history_window);
            let history = state.messages[start..]
                .iter()
                .map(|m| HistoryTurn {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect();

            let index = state.messages.len();
            state.messages.push(ChatMessage::user(text));
            state.pending = true;

            let ticket = GenerationTicket {
                generation: state.generation,
                index,
                request: GenerationRequest {
                    message: text.to_string(),
                    history,
                },
            };
            self.publish(SessionEvent::MessageAppended {
                index,
                role: Role::User,
                generation: state.generation,
            });
            ticket
        };

        info!(
            "Submitted question at index {} (generation {})",
            ticket.index, ticket.generation
        );
        Ok(ticket)
    }

    /// Deliver the outcome of the request dispatched under `generation`.
    pub fn on_response(
        &self,
        generation: u64,
        result: Result<GeneratedAnswer, String>,
    ) -> ResponseOutcome {
        let outcome = {
            let mut state = self.state.lock();
            if generation != state.generation {
                debug!(
                    "Discarding response from generation {} (current {})",
                    generation, state.generation
                );
                return ResponseOutcome::Discarded(DiscardReason::StaleGeneration {
                    ticket: generation,
                    current: state.generation,
                });
            }
            if !state.pending {
                debug!("Discarding response with no pending request");
                return ResponseOutcome::Discarded(DiscardReason::NotPending);
            }

            state.pending = false;
            let (outcome, event) = match result {
                Ok(answer) => {
                    let index = state.messages.len();
                    state.messages.push(ChatMessage::assistant(answer.content));
                    state.citations.record(index, answer.citations);
                    (
                        ResponseOutcome::Appended { index },
                        SessionEvent::MessageAppended {
                            index,
                            role: Role::Assistant,
                            generation,
                        },
                    )
                }
                Err(reason) => (
                    ResponseOutcome::Failed {
                        reason: reason.clone(),
                    },
                    SessionEvent::GenerationFailed { reason, generation },
                ),
            };
            self.publish(event);
            outcome
        };

        match &outcome {
            ResponseOutcome::Appended { index } => info!("Answer recorded at index {}", index),
            ResponseOutcome::Failed { reason } => warn!("Generation failed: {}", reason),
            ResponseOutcome::Discarded(_) => {}
        }
        outcome
    }

    /// Reset to an empty session and invalidate any in-flight request
    pub fn clear(&self) {
        let generation = {
            let mut state = self.state.lock();
            state.messages.clear();
            state.citations.clear();
            state.pending = false;
            state.generation += 1;
            self.publish(SessionEvent::Cleared {
                generation: state.generation,
            });
            state.generation
        };
        info!("Session cleared (generation {})", generation);
    }

    /// Render the current conversation; fails on an empty session
    pub fn export_transcript(&self, format: TranscriptFormat) -> crate::Result<String> {
        let state = self.state.lock();
        transcript::export(&state.messages, &state.citations, format)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            messages: state.messages.clone(),
            citations: state.citations.clone(),
            pending: state.pending,
            generation: state.generation,
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().messages.clone()
    }

    /// Citations of the message at `index`; `None` for user messages and
    /// unknown indices
    pub fn citations(&self, index: usize) -> Option<Vec<Citation>> {
        self.state.lock().citations.get(index).map(<[Citation]>::to_vec)
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().pending
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Called with the state lock held so events arrive in mutation order.
    /// `broadcast::send` never blocks.
    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionManager")
            .field("messages", &state.messages.len())
            .field("pending", &state.pending)
            .field("generation", &state.generation)
            .field("history_window", &self.history_window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn legifrance_answer() -> GeneratedAnswer {
        GeneratedAnswer::new("Le Code civil est...")
            .with_citation(Citation::new("Art. 1").with_metadata("source", "Legifrance"))
    }

    #[test]
    fn test_submit_and_answer() {
        let manager = SessionManager::default();

        let ticket = manager.submit("Qu'est-ce que le Code civil ?").unwrap();
        assert_eq!(ticket.index, 0);
        assert_eq!(ticket.request.message, "Qu'est-ce que le Code civil ?");
        assert!(ticket.request.history.is_empty());
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.messages()[0].role, Role::User);
        assert!(manager.is_pending());

        let outcome = manager.on_response(ticket.generation, Ok(legifrance_answer()));
        assert_eq!(outcome, ResponseOutcome::Appended { index: 1 });
        assert_eq!(manager.len(), 2);
        assert!(!manager.is_pending());

        let citations = manager.citations(1).unwrap();
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].metadata.get("source"), Some("Legifrance"));
        assert!(manager.citations(0).is_none());
    }

    #[test]
    fn test_submit_trims_and_rejects_empty() {
        let manager = SessionManager::default();
        assert_eq!(manager.submit("   \n\t").unwrap_err(), SubmitRejected::EmptyText);
        assert!(manager.is_empty());
        assert!(!manager.is_pending());

        let ticket = manager.submit("  Delai de prescription \n").unwrap();
        assert_eq!(ticket.request.message, "Delai de prescription");
        assert_eq!(manager.messages()[0].content, "Delai de prescription");
    }

    #[test]
    fn test_second_submit_while_pending_is_noop() {
        let manager = SessionManager::default();
        let ticket = manager.submit("A").unwrap();

        assert_eq!(manager.submit("B").unwrap_err(), SubmitRejected::RequestPending);
        assert_eq!(manager.len(), 1);

        manager.on_response(ticket.generation, Ok(GeneratedAnswer::new("a")));
        assert_eq!(manager.len(), 2);
        assert!(manager.submit("B").is_ok());
    }

    #[test]
    fn test_failure_keeps_user_message() {
        let manager = SessionManager::default();
        let ticket = manager.submit("Expliquez l'article 1240").unwrap();

        let outcome = manager.on_response(ticket.generation, Err("backend unavailable".into()));
        assert_eq!(
            outcome,
            ResponseOutcome::Failed {
                reason: "backend unavailable".to_string()
            }
        );
        assert_eq!(manager.len(), 1);
        assert!(!manager.is_pending());
        assert!(manager.snapshot().citations.is_empty());

        // The user may resubmit.
        assert!(manager.submit("Expliquez l'article 1240").is_ok());
    }

    #[test]
    fn test_clear_resets_state_and_bumps_generation() {
        let manager = SessionManager::default();
        for question in ["Q1", "Q2"] {
            let ticket = manager.submit(question).unwrap();
            manager.on_response(ticket.generation, Ok(legifrance_answer()));
        }
        assert_eq!(manager.len(), 4);
        assert_eq!(manager.generation(), 0);

        manager.clear();

        let snapshot = manager.snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.citations.is_empty());
        assert!(!snapshot.pending);
        assert_eq!(snapshot.generation, 1);
    }

    #[test]
    fn test_stale_response_after_clear_is_discarded() {
        let manager = SessionManager::default();
        let ticket = manager.submit("Q").unwrap();

        manager.clear();
        let outcome = manager.on_response(ticket.generation, Ok(legifrance_answer()));

        assert_eq!(
            outcome,
            ResponseOutcome::Discarded(DiscardReason::StaleGeneration {
                ticket: 0,
                current: 1
            })
        );
        assert!(manager.is_empty());
        assert!(manager.snapshot().citations.is_empty());
        assert!(!manager.is_pending());
    }

    #[test]
    fn test_stale_response_does_not_resolve_new_request() {
        let manager = SessionManager::default();
        let old = manager.submit("old").unwrap();
        manager.clear();
        let new = manager.submit("new").unwrap();

        manager.on_response(old.generation, Ok(GeneratedAnswer::new("old answer")));
        assert!(manager.is_pending());
        assert_eq!(manager.len(), 1);

        manager.on_response(new.generation, Ok(GeneratedAnswer::new("new answer")));
        assert_eq!(manager.messages()[1].content, "new answer");
    }

    #[test]
    fn test_duplicate_response_is_discarded() {
        let manager = SessionManager::default();
        let ticket = manager.submit("Q").unwrap();
        manager.on_response(ticket.generation, Ok(GeneratedAnswer::new("R")));

        let outcome = manager.on_response(ticket.generation, Ok(GeneratedAnswer::new("R bis")));
        assert_eq!(outcome, ResponseOutcome::Discarded(DiscardReason::NotPending));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_history_window_limits_context() {
        let manager = SessionManager::new(3);
        for i in 0..3 {
            let ticket = manager.submit(&format!("Q{}", i)).unwrap();
            manager.on_response(ticket.generation, Ok(GeneratedAnswer::new(format!("R{}", i))));
        }

        let ticket = manager.submit("Q3").unwrap();
        let history: Vec<&str> = ticket
            .request
            .history
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(history, vec!["R1", "Q2", "R2"]);
        assert_eq!(ticket.request.history[0].role, Role::Assistant);
        assert_eq!(ticket.index, 6);
    }

    #[test]
    fn test_citation_table_only_indexes_assistant_messages() {
        let manager = SessionManager::default();
        let outcomes = [
            Ok(legifrance_answer()),
            Err("timeout".to_string()),
            Ok(GeneratedAnswer::new("sans sources")),
        ];
        for result in outcomes {
            let ticket = manager.submit("Q").unwrap();
            manager.on_response(ticket.generation, result);
        }

        let snapshot = manager.snapshot();
        for (index, _) in snapshot.citations.iter() {
            assert_eq!(snapshot.messages[index].role, Role::Assistant);
        }
        let assistant_count = snapshot
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();
        assert_eq!(snapshot.citations.len(), assistant_count);
        assert_eq!(snapshot.messages.len(), 5);
    }

    #[test]
    fn test_events_follow_mutations() {
        let manager = SessionManager::default();
        let mut events = manager.subscribe();

        let ticket = manager.submit("Q").unwrap();
        manager.on_response(ticket.generation, Err("boom".into()));
        manager.clear();
        manager.submit("").unwrap_err();

        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::MessageAppended {
                index: 0,
                role: Role::User,
                generation: 0
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::GenerationFailed {
                reason: "boom".to_string(),
                generation: 0
            }
        );
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Cleared { generation: 1 });
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    fn event_generation(event: &SessionEvent) -> u64 {
        match event {
            SessionEvent::MessageAppended { generation, .. }
            | SessionEvent::GenerationFailed { generation, .. }
            | SessionEvent::Cleared { generation } => *generation,
        }
    }

    #[test]
    fn test_concurrent_events_keep_generation_order() {
        let manager = std::sync::Arc::new(SessionManager::default());
        let mut events = manager.subscribe();

        let clearer = {
            let manager = manager.clone();
            std::thread::spawn(move || {
                for _ in 0..10 {
                    manager.clear();
                    std::thread::yield_now();
                }
            })
        };
        let asker = {
            let manager = manager.clone();
            std::thread::spawn(move || {
                for i in 0..10 {
                    if let Ok(ticket) = manager.submit(&format!("Question {}", i)) {
                        std::thread::yield_now();
                        manager.on_response(ticket.generation, Ok(GeneratedAnswer::new("R")));
                    }
                }
            })
        };
        clearer.join().unwrap();
        asker.join().unwrap();

        let mut last = 0;
        let mut clears = 0;
        while let Ok(event) = events.try_recv() {
            let generation = event_generation(&event);
            assert!(
                generation >= last,
                "event {:?} arrived after generation {}",
                event,
                last
            );
            if let SessionEvent::Cleared { generation } = event {
                assert_eq!(generation, last + 1);
                clears += 1;
            }
            last = generation;
        }
        assert_eq!(clears, 10);
        assert_eq!(manager.generation(), 10);
    }

    #[test]
    fn test_export_empty_session_is_rejected() {
        let manager = SessionManager::default();
        let err = manager
            .export_transcript(TranscriptFormat::Markdown)
            .unwrap_err();
        assert!(matches!(err, crate::Error::EmptyTranscript));
    }
}
