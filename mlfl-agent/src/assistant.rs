//! Assistant: submits a question, calls the backend, records the answer

use mlfl_core::config::Config;
use mlfl_core::session::{ResponseOutcome, SessionManager, SubmitRejected};
use mlfl_providers::{AnswerProvider, BackendClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Result of a single [`Assistant::ask`]
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// Nothing was sent; the session is unchanged
    Rejected(SubmitRejected),
    /// The answer was appended at `index`
    Answered { index: usize },
    /// The backend failed or timed out
    Failed { reason: String },
    /// The session was cleared while the question was in flight
    Discarded,
}

/// Drives one conversation against an answer provider.
///
/// The session is shared so a front end can observe, clear or export it while
/// `ask` is awaiting the backend.
pub struct Assistant {
    session: Arc<SessionManager>,
    provider: Arc<dyn AnswerProvider>,
    timeout: Duration,
}

impl Assistant {
    pub fn new(
        session: Arc<SessionManager>,
        provider: Arc<dyn AnswerProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            provider,
            timeout,
        }
    }

    /// Build an assistant talking to the configured HTTP backend
    pub fn from_config(config: &Config) -> Self {
        let session = Arc::new(SessionManager::new(config.session.history_window));
        let provider = Arc::new(BackendClient::from_config(&config.backend));
        Self::new(
            session,
            provider,
            Duration::from_secs(config.backend.timeout_secs),
        )
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn provider(&self) -> &Arc<dyn AnswerProvider> {
        &self.provider
    }

    /// Submit `text` and wait for the answer.
    ///
    /// The session lock is not held while the provider runs.
    pub async fn ask(&self, text: &str) -> AskOutcome {
        let ticket = match self.session.submit(text) {
            Ok(ticket) => ticket,
            Err(rejected) => {
                debug!("Submission rejected: {}", rejected);
                return AskOutcome::Rejected(rejected);
            }
        };

        info!(
            "Asking {} (generation {}, {} history turns)",
            self.provider.name(),
            ticket.generation,
            ticket.request.history.len()
        );

        let result = match tokio::time::timeout(self.timeout, self.provider.answer(ticket.request))
            .await
        {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "no answer after {} seconds",
                self.timeout.as_secs_f64()
            )),
        };

        match self.session.on_response(ticket.generation, result) {
            ResponseOutcome::Appended { index } => AskOutcome::Answered { index },
            ResponseOutcome::Failed { reason } => AskOutcome::Failed { reason },
            ResponseOutcome::Discarded(reason) => {
                debug!("Answer discarded: {:?}", reason);
                AskOutcome::Discarded
            }
        }
    }
}
