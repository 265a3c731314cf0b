//! Aura Storage crate - SQLite persistence for sessions and module data.
//!
//! Provides a WAL-mode SQLite database with migrations, the append-only
//! session log with its named counters, and repositories for tasks, notes,
//! meeting summaries, user preferences and custom commands.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod session;

pub use db::Database;
pub use repository::{
    CustomCommand, CustomCommandRepository, MeetingRepository, MeetingSummary, NoteFilter,
    NoteRecord, NoteRepository, NoteUpdate, PreferenceRepository, TaskRecord, TaskRepository,
    NOTE_COUNTER,
};
pub use session::{SessionStore, SESSION_COUNTER};
