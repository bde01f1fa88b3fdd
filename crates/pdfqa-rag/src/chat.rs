//! Chat orchestration: retrieval, refusal policy, generation

use std::sync::Arc;
use tracing::info;

use pdfqa_core::{ChatResponse, Result, RetrievalTrace, Turn, TurnOutcome};

use crate::generator::AnswerGenerator;
use crate::retriever::Retriever;
use crate::session::SessionStore;

/// Fixed answer for turns where nothing relevant was retrieved
pub const REFUSAL: &str =
    "I can't find this in the uploaded documents. Please rephrase or upload a PDF that contains it.";

/// Composes the retriever and generator behind the refusal policy
pub struct ChatOrchestrator {
    retriever: Retriever,
    generator: AnswerGenerator,
    sessions: Arc<SessionStore>,
}

impl ChatOrchestrator {
    pub fn new(retriever: Retriever, generator: AnswerGenerator, sessions: Arc<SessionStore>) -> Self {
        Self {
            retriever,
            generator,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer `message` within `session_id` and record the turn
    ///
    /// An empty retrieval refuses without calling the generator. Concurrent
    /// turns on one session run one after another.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatResponse> {
        let handle = self.sessions.handle(session_id)?;
        let mut turns = handle.lock().await;

        let retrieved = self.retriever.retrieve(message).await?;

        let response = if retrieved.is_empty() {
            info!(session_id, "nothing retrieved, refusing");
            ChatResponse {
                answer: REFUSAL.to_string(),
                citations: Vec::new(),
                trace: RetrievalTrace {
                    outcome: TurnOutcome::Refused,
                    retrieved,
                },
            }
        } else {
            let answer = self.generator.generate(message, &retrieved).await;
            info!(
                session_id,
                retrieved = retrieved.len(),
                citations = answer.citations.len(),
                "answer generated"
            );
            ChatResponse {
                answer: answer.text,
                citations: answer.citations,
                trace: RetrievalTrace {
                    outcome: TurnOutcome::Generated,
                    retrieved,
                },
            }
        };

        turns.push(Turn::new(message, response.answer.clone()));
        Ok(response)
    }

    /// Ordered turns of a session
    pub async fn session_history(&self, session_id: &str) -> Result<Vec<Turn>> {
        self.sessions.history(session_id).await
    }

    pub fn new_session_id(&self) -> String {
        SessionStore::new_session_id()
    }
}
