//! Database schema migrations.
//!
//! Applies the initial schema: counters, the session turn log, and the
//! per-module tables (tasks, notes, meeting summaries, preferences,
//! custom commands).

use rusqlite::Connection;
use tracing::info;

use aura_core::error::AuraError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), AuraError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| AuraError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AuraError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), AuraError> {
    conn.execute_batch(
        "
        -- Named monotonic counters (session ids, note ids).
        CREATE TABLE IF NOT EXISTS counters (
            name        TEXT PRIMARY KEY NOT NULL,
            value       INTEGER NOT NULL DEFAULT 0
        );

        -- Append-only conversation log.
        CREATE TABLE IF NOT EXISTS turns (
            session_id      INTEGER NOT NULL,
            seq             INTEGER NOT NULL,
            timestamp       INTEGER NOT NULL,
            raw_command     TEXT NOT NULL,
            response_text   TEXT NOT NULL,
            PRIMARY KEY (session_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_turns_session_desc
            ON turns (session_id DESC);

        CREATE TABLE IF NOT EXISTS tasks (
            title           TEXT PRIMARY KEY NOT NULL,
            priority        TEXT NOT NULL DEFAULT 'medium'
                            CHECK (priority IN ('high', 'medium', 'low')),
            category        TEXT NOT NULL DEFAULT 'personal',
            deadline        INTEGER,
            deadline_text   TEXT,
            notified        INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_deadline
            ON tasks (deadline ASC)
            WHERE deadline IS NOT NULL;

        CREATE TABLE IF NOT EXISTS notes (
            note_id     INTEGER PRIMARY KEY NOT NULL,
            title       TEXT NOT NULL DEFAULT '',
            content     TEXT NOT NULL DEFAULT '',
            tags        TEXT NOT NULL DEFAULT '[]',
            timestamp   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notes_timestamp
            ON notes (timestamp DESC);

        CREATE TABLE IF NOT EXISTS meeting_summaries (
            title       TEXT PRIMARY KEY NOT NULL,
            transcript  TEXT NOT NULL,
            summary     TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id         TEXT NOT NULL,
            preference_type TEXT NOT NULL,
            value           TEXT NOT NULL,
            updated_at      INTEGER NOT NULL,
            PRIMARY KEY (user_id, preference_type)
        );

        CREATE TABLE IF NOT EXISTS custom_commands (
            name        TEXT PRIMARY KEY NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            action      TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| AuraError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
