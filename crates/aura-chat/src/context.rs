//! Session bootstrap and conversational context.
//!
//! A session is allocated from the store's counter, then seeded with the
//! history of the most recent session that has turns. Every parsed command
//! is appended to the log and to the in-memory context that the next parse
//! sees.

use aura_core::types::{HistoryEntry, Turn};
use aura_storage::SessionStore;

use crate::error::ChatError;

/// Running context of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub session_id: i64,
    /// Prior turns flattened into user/model entries, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl SessionContext {
    pub fn new(session_id: i64, history: Vec<HistoryEntry>) -> Self {
        Self {
            session_id,
            history,
        }
    }
}

/// Creates sessions and records their turns.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: SessionStore,
}

impl SessionManager {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Allocate a new session id, then load the latest session's history.
    ///
    /// The order matters: the fresh session has no turns yet, so the
    /// history read sees the previous conversation.
    pub fn bootstrap(&self) -> Result<SessionContext, ChatError> {
        let session_id = self.store.next_session_id()?;
        let history = self.store.latest_session_history()?;
        tracing::info!(session_id, seeded_entries = history.len(), "Session started");
        Ok(SessionContext::new(session_id, history))
    }

    /// Append one turn to the log and extend the live context.
    pub fn record(
        &self,
        context: &mut SessionContext,
        raw_command: &str,
        response_text: &str,
    ) -> Result<Turn, ChatError> {
        let turn = self
            .store
            .append_turn(context.session_id, raw_command, response_text)?;
        context.history.push(HistoryEntry::user(raw_command));
        context.history.push(HistoryEntry::model(response_text));
        Ok(turn)
    }

    /// Stored turns of a session in append order.
    pub fn turns(&self, session_id: i64) -> Result<Vec<Turn>, ChatError> {
        Ok(self.store.session_turns(session_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aura_storage::Database;

    fn manager() -> SessionManager {
        let db = Arc::new(Database::in_memory().unwrap());
        SessionManager::new(SessionStore::new(db))
    }

    #[test]
    fn test_first_bootstrap_is_empty() {
        let manager = manager();
        let context = manager.bootstrap().unwrap();
        assert_eq!(context.session_id, 1);
        assert!(context.history.is_empty());
    }

    #[test]
    fn test_bootstrap_seeds_previous_session() {
        let manager = manager();
        let mut first = manager.bootstrap().unwrap();
        manager.record(&mut first, "c1", "r1").unwrap();
        manager.record(&mut first, "c2", "r2").unwrap();

        let second = manager.bootstrap().unwrap();
        assert_eq!(second.session_id, 2);
        assert_eq!(
            second.history,
            vec![
                HistoryEntry::user("c1"),
                HistoryEntry::model("r1"),
                HistoryEntry::user("c2"),
                HistoryEntry::model("r2"),
            ]
        );
    }

    #[test]
    fn test_record_extends_context_and_log() {
        let manager = manager();
        let mut context = manager.bootstrap().unwrap();
        let turn = manager.record(&mut context, "hello", "{\"module\": \"\"}").unwrap();
        assert_eq!((turn.session_id, turn.seq), (context.session_id, 1));
        assert_eq!(context.history.len(), 2);

        let turns = manager.turns(context.session_id).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].raw_command, "hello");
    }
}
