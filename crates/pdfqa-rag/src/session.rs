//! Multi-turn session bookkeeping

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use pdfqa_core::{Error, Result, Turn};

/// Turn log of one session, locked for the duration of a chat turn
pub type SessionHandle = Arc<AsyncMutex<Vec<Turn>>>;

/// In-process store of session turn logs
///
/// The map lock is only held to look up or create a handle. Turns on the same
/// session are serialized through the handle's async lock; different sessions
/// never contend.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh session id
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Handle for `session_id`, creating an empty log on first use
    pub fn handle(&self, session_id: &str) -> Result<SessionHandle> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
        Ok(sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Vec::new())))
            .clone())
    }

    /// Turns of `session_id` in the order they happened
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        let handle = {
            let sessions = self
                .sessions
                .lock()
                .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
            sessions.get(session_id).cloned()
        };

        let handle = handle.ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        let turns = handle.lock().await.clone();
        if turns.is_empty() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(turns)
    }

    /// Ids of sessions with at least one recorded turn
    ///
    /// A handle opened for a turn that failed before recording anything does
    /// not count.
    pub async fn sessions(&self) -> Result<Vec<String>> {
        let handles: Vec<(String, SessionHandle)> = {
            let sessions = self
                .sessions
                .lock()
                .map_err(|e| Error::Other(format!("Lock error: {}", e)))?;
            sessions
                .iter()
                .map(|(id, handle)| (id.clone(), handle.clone()))
                .collect()
        };

        let mut ids = Vec::new();
        for (id, handle) in handles {
            if !handle.lock().await.is_empty() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn record(store: &SessionStore, session_id: &str, user: &str, assistant: &str) {
        let handle = store.handle(session_id).unwrap();
        handle.lock().await.push(Turn::new(user, assistant));
    }

    #[tokio::test]
    async fn test_history_in_append_order() {
        let store = SessionStore::new();
        record(&store, "s1", "hi", "hello").await;
        record(&store, "s1", "again", "still here").await;

        let history = store.history("s1").await.unwrap();
        let users: Vec<&str> = history.iter().map(|t| t.user.as_str()).collect();
        assert_eq!(users, vec!["hi", "again"]);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = SessionStore::new();
        assert!(matches!(
            store.history("missing").await,
            Err(Error::SessionNotFound(ref id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn test_session_without_turns_is_not_found() {
        let store = SessionStore::new();
        store.handle("opened").unwrap();
        assert!(matches!(
            store.history("opened").await,
            Err(Error::SessionNotFound(_))
        ));
        assert!(store.sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        record(&store, "a", "q1", "a1").await;
        record(&store, "b", "q2", "a2").await;

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert_eq!(store.history("b").await.unwrap()[0].user, "q2");
        assert_eq!(store.sessions().await.unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_new_session_ids_are_unique() {
        let a = SessionStore::new_session_id();
        let b = SessionStore::new_session_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}
