//! Session log and named counters.
//!
//! Sessions are numbered from the `session` counter. Each session owns an
//! append-only sequence of turns keyed by `(session_id, seq)`.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use aura_core::error::AuraError;
use aura_core::types::{HistoryEntry, Turn};

use crate::db::{storage_err, Database};

/// Counter backing session ids.
pub const SESSION_COUNTER: &str = "session";

/// Increment a named counter and return its new value.
///
/// A missing counter starts at zero, so the first call returns 1.
pub(crate) fn increment_counter(conn: &Connection, name: &str) -> Result<i64, AuraError> {
    conn.query_row(
        "INSERT INTO counters (name, value) VALUES (?1, 1)
         ON CONFLICT(name) DO UPDATE SET value = value + 1
         RETURNING value",
        [name],
        |row| row.get(0),
    )
    .map_err(storage_err("Failed to increment counter"))
}

pub(crate) fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Persistent conversation log.
#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Arc<Database>,
}

impl SessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Atomically bump the named counter and return the new value.
    pub fn next_counter(&self, name: &str) -> Result<i64, AuraError> {
        self.db.with_conn(|conn| increment_counter(conn, name))
    }

    /// Allocate a fresh session id. Ids are strictly increasing with no gaps.
    pub fn next_session_id(&self) -> Result<i64, AuraError> {
        let id = self.next_counter(SESSION_COUNTER)?;
        debug!(session_id = id, "Allocated session id");
        Ok(id)
    }

    /// Highest session id that has at least one turn.
    pub fn latest_session_id(&self) -> Result<Option<i64>, AuraError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT MAX(session_id) FROM turns", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .map_err(storage_err("Failed to query latest session"))
        })
    }

    /// Flatten the most recent session into alternating user/model entries.
    ///
    /// Turns with an empty command or response are skipped.
    pub fn latest_session_history(&self) -> Result<Vec<HistoryEntry>, AuraError> {
        let Some(session_id) = self.latest_session_id()? else {
            return Ok(Vec::new());
        };

        let turns = self.session_turns(session_id)?;
        let mut history = Vec::with_capacity(turns.len() * 2);
        for turn in turns {
            if turn.raw_command.is_empty() || turn.response_text.is_empty() {
                continue;
            }
            history.push(HistoryEntry::user(turn.raw_command));
            history.push(HistoryEntry::model(turn.response_text));
        }
        Ok(history)
    }

    /// Append one turn to a session. Never overwrites an existing turn.
    pub fn append_turn(
        &self,
        session_id: i64,
        raw_command: &str,
        response_text: &str,
    ) -> Result<Turn, AuraError> {
        let timestamp = Utc::now();
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(storage_err("Failed to begin append"))?;

            let seq: i64 = tx
                .query_row(
                    "SELECT COALESCE(MAX(seq), 0) + 1 FROM turns WHERE session_id = ?1",
                    [session_id],
                    |row| row.get(0),
                )
                .map_err(storage_err("Failed to read turn sequence"))?;

            tx.execute(
                "INSERT INTO turns (session_id, seq, timestamp, raw_command, response_text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    session_id,
                    seq,
                    timestamp.timestamp_millis(),
                    raw_command,
                    response_text,
                ],
            )
            .map_err(storage_err("Failed to append turn"))?;

            tx.commit().map_err(storage_err("Failed to commit turn"))?;

            debug!(session_id, seq, "Appended turn");
            Ok(Turn {
                session_id,
                seq,
                timestamp: millis_to_utc(timestamp.timestamp_millis()),
                raw_command: raw_command.to_string(),
                response_text: response_text.to_string(),
            })
        })
    }

    /// All turns of one session in append order.
    pub fn session_turns(&self, session_id: i64) -> Result<Vec<Turn>, AuraError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT session_id, seq, timestamp, raw_command, response_text
                     FROM turns WHERE session_id = ?1
                     ORDER BY seq ASC",
                )
                .map_err(storage_err("Failed to prepare turn query"))?;

            let rows = stmt
                .query_map([session_id], |row| {
                    Ok(Turn {
                        session_id: row.get(0)?,
                        seq: row.get(1)?,
                        timestamp: millis_to_utc(row.get(2)?),
                        raw_command: row.get(3)?,
                        response_text: row.get(4)?,
                    })
                })
                .map_err(storage_err("Failed to query turns"))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(storage_err("Failed to read turn"))
        })
    }

    /// Current value of a counter without incrementing it.
    pub fn counter_value(&self, name: &str) -> Result<i64, AuraError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT value FROM counters WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()
            .map(|v| v.unwrap_or(0))
            .map_err(storage_err("Failed to read counter"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::types::Role;

    fn make_store() -> SessionStore {
        SessionStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    // ---- Counters ----

    #[test]
    fn test_next_session_id_starts_at_one_and_increments() {
        let store = make_store();
        assert_eq!(store.next_session_id().unwrap(), 1);
        assert_eq!(store.next_session_id().unwrap(), 2);
        assert_eq!(store.next_session_id().unwrap(), 3);
        assert_eq!(store.counter_value(SESSION_COUNTER).unwrap(), 3);
    }

    #[test]
    fn test_counters_are_independent() {
        let store = make_store();
        store.next_session_id().unwrap();
        store.next_session_id().unwrap();
        assert_eq!(store.next_counter("note").unwrap(), 1);
        assert_eq!(store.counter_value("missing").unwrap(), 0);
    }

    #[test]
    fn test_next_session_id_concurrent_unique() {
        let store = make_store();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| store.next_session_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        let expected: Vec<i64> = (1..=200).collect();
        assert_eq!(ids, expected);
    }

    // ---- Turns ----

    #[test]
    fn test_history_order() {
        let store = make_store();
        let sid = store.next_session_id().unwrap();
        store.append_turn(sid, "c1", "r1").unwrap();
        store.append_turn(sid, "c2", "r2").unwrap();

        let history = store.latest_session_history().unwrap();
        let flat: Vec<(Role, &str)> = history.iter().map(|h| (h.role, h.text.as_str())).collect();
        assert_eq!(
            flat,
            vec![
                (Role::User, "c1"),
                (Role::Model, "r1"),
                (Role::User, "c2"),
                (Role::Model, "r2"),
            ]
        );
    }

    #[test]
    fn test_append_round_trip_exactly_once() {
        let store = make_store();
        let sid = store.next_session_id().unwrap();
        let turn = store.append_turn(sid, "add a task", "{\"module\":\"task\"}").unwrap();
        assert_eq!(turn.seq, 1);

        let turns = store.session_turns(sid).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].raw_command, "add a task");
        assert_eq!(turns[0].response_text, "{\"module\":\"task\"}");
    }

    #[test]
    fn test_latest_history_uses_highest_session() {
        let store = make_store();
        let first = store.next_session_id().unwrap();
        let second = store.next_session_id().unwrap();
        store.append_turn(second, "newer", "b").unwrap();
        store.append_turn(first, "older", "a").unwrap();

        let history = store.latest_session_history().unwrap();
        assert_eq!(history[0].text, "newer");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_latest_history_empty_store() {
        let store = make_store();
        assert!(store.latest_session_history().unwrap().is_empty());
        assert_eq!(store.latest_session_id().unwrap(), None);
    }

    #[test]
    fn test_history_skips_incomplete_turns() {
        let store = make_store();
        let sid = store.next_session_id().unwrap();
        store.append_turn(sid, "c1", "").unwrap();
        store.append_turn(sid, "c2", "r2").unwrap();

        let history = store.latest_session_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "c2");
    }

    #[test]
    fn test_session_turns_isolated_per_session() {
        let store = make_store();
        let a = store.next_session_id().unwrap();
        let b = store.next_session_id().unwrap();
        store.append_turn(a, "a1", "ra1").unwrap();
        store.append_turn(b, "b1", "rb1").unwrap();
        store.append_turn(a, "a2", "ra2").unwrap();

        let turns = store.session_turns(a).unwrap();
        let seqs: Vec<i64> = turns.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(store.session_turns(b).unwrap().len(), 1);
    }
}
