//! Repository implementations for the module handlers.
//!
//! Provides TaskRepository, NoteRepository, MeetingRepository,
//! PreferenceRepository and CustomCommandRepository, all operating on the
//! shared Database with raw SQL.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use aura_core::error::AuraError;

use crate::db::{storage_err, Database};
use crate::session::increment_counter;

/// Counter backing note ids.
pub const NOTE_COUNTER: &str = "note";

// ============================================================================
// Records
// ============================================================================

/// A task, keyed by its title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub title: String,
    pub priority: String,
    pub category: String,
    pub deadline: Option<DateTime<Utc>>,
    /// The deadline phrase as the user said it.
    pub deadline_text: Option<String>,
    #[serde(skip_serializing, default)]
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(title: impl Into<String>, priority: &str, category: &str) -> Self {
        Self {
            title: title.into(),
            priority: priority.to_string(),
            category: category.to_string(),
            deadline: None,
            deadline_text: None,
            notified: false,
            created_at: Utc::now(),
        }
    }
}

/// A note with a numeric id allocated from the `note` counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub note_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Criteria for note retrieval. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub note_id: Option<i64>,
    pub tag: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the content.
    pub keyword: Option<String>,
}

/// Partial note update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub title: String,
    pub transcript: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// A user-defined shell command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCommand {
    pub name: String,
    pub description: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

fn secs_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

// ============================================================================
// Tasks
// ============================================================================

const TASK_COLUMNS: &str =
    "title, priority, category, deadline, deadline_text, notified, created_at";

/// Repository for tasks.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    db: Arc<Database>,
}

impl TaskRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace a task by title. Replacing resets the notified flag.
    pub fn upsert(&self, task: &TaskRecord) -> Result<(), AuraError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (title, priority, category, deadline, deadline_text, notified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                 ON CONFLICT(title) DO UPDATE SET
                    priority = excluded.priority,
                    category = excluded.category,
                    deadline = excluded.deadline,
                    deadline_text = excluded.deadline_text,
                    notified = 0",
                rusqlite::params![
                    task.title,
                    task.priority,
                    task.category,
                    task.deadline.map(|d| d.timestamp()),
                    task.deadline_text,
                    task.created_at.timestamp(),
                ],
            )
            .map_err(storage_err("Failed to save task"))?;
            Ok(())
        })
    }

    pub fn find(&self, title: &str) -> Result<Option<TaskRecord>, AuraError> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE title = ?1"),
            rusqlite::params![title],
        )
        .map(|mut tasks| tasks.pop())
    }

    pub fn by_priority(&self, priority: &str) -> Result<Vec<TaskRecord>, AuraError> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE priority = ?1 ORDER BY created_at ASC"),
            rusqlite::params![priority.to_lowercase()],
        )
    }

    pub fn by_category(&self, category: &str) -> Result<Vec<TaskRecord>, AuraError> {
        self.query_tasks(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE category = ?1 ORDER BY created_at ASC"),
            rusqlite::params![category.to_lowercase()],
        )
    }

    /// Tasks with a deadline at or before `cutoff`, earliest first.
    pub fn due_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<TaskRecord>, AuraError> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE deadline IS NOT NULL AND deadline <= ?1
                 ORDER BY deadline ASC"
            ),
            rusqlite::params![cutoff.timestamp()],
        )
    }

    /// High-priority tasks plus anything due at or before `cutoff`.
    pub fn urgent(&self, cutoff: DateTime<Utc>) -> Result<Vec<TaskRecord>, AuraError> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE priority = 'high' OR (deadline IS NOT NULL AND deadline <= ?1)
                 ORDER BY deadline IS NULL, deadline ASC"
            ),
            rusqlite::params![cutoff.timestamp()],
        )
    }

    /// Tasks due in `[from, until]` that have not been announced yet.
    pub fn pending_notifications(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, AuraError> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE notified = 0 AND deadline IS NOT NULL
                   AND deadline >= ?1 AND deadline <= ?2
                 ORDER BY deadline ASC"
            ),
            rusqlite::params![from.timestamp(), until.timestamp()],
        )
    }

    pub fn mark_notified(&self, title: &str) -> Result<(), AuraError> {
        self.db.with_conn(|conn| {
            conn.execute("UPDATE tasks SET notified = 1 WHERE title = ?1", [title])
                .map_err(storage_err("Failed to mark task notified"))?;
            Ok(())
        })
    }

    /// Delete a task. Returns false when no task had that title.
    pub fn delete(&self, title: &str) -> Result<bool, AuraError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM tasks WHERE title = ?1", [title])
                .map_err(storage_err("Failed to delete task"))?;
            Ok(changed > 0)
        })
    }

    fn query_tasks(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<TaskRecord>, AuraError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(sql).map_err(storage_err("Task query prepare"))?;
            let rows = stmt
                .query_map(params, |row| {
                    Ok(TaskRecord {
                        title: row.get(0)?,
                        priority: row.get(1)?,
                        category: row.get(2)?,
                        deadline: row.get::<_, Option<i64>>(3)?.map(secs_to_utc),
                        deadline_text: row.get(4)?,
                        notified: row.get::<_, i64>(5)? != 0,
                        created_at: secs_to_utc(row.get(6)?),
                    })
                })
                .map_err(storage_err("Task query"))?;
            let tasks = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err("Task row"))?;
            Ok(tasks)
        })
    }
}

// ============================================================================
// Notes
// ============================================================================

/// Repository for notes.
#[derive(Debug, Clone)]
pub struct NoteRepository {
    db: Arc<Database>,
}

impl NoteRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Allocate the next note id and store the note in one transaction.
    pub fn add(&self, title: &str, content: &str, tags: &[String]) -> Result<NoteRecord, AuraError> {
        let timestamp = Utc::now();
        let tags_json = serde_json::to_string(tags)?;
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(storage_err("Failed to begin note insert"))?;
            let note_id = increment_counter(&tx, NOTE_COUNTER)?;
            tx.execute(
                "INSERT INTO notes (note_id, title, content, tags, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![note_id, title, content, tags_json, timestamp.timestamp()],
            )
            .map_err(storage_err("Failed to save note"))?;
            tx.commit().map_err(storage_err("Failed to commit note"))?;

            Ok(NoteRecord {
                note_id,
                title: title.to_string(),
                content: content.to_string(),
                tags: tags.to_vec(),
                timestamp: secs_to_utc(timestamp.timestamp()),
            })
        })
    }

    pub fn get(&self, note_id: i64) -> Result<Option<NoteRecord>, AuraError> {
        let filter = NoteFilter {
            note_id: Some(note_id),
            ..NoteFilter::default()
        };
        Ok(self.query(&filter)?.pop())
    }

    /// Notes matching every set criterion, oldest first.
    ///
    /// A `note_id` short-circuits the other criteria.
    pub fn query(&self, filter: &NoteFilter) -> Result<Vec<NoteRecord>, AuraError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(id) = filter.note_id {
            clauses.push("note_id = ?");
            params.push(Box::new(id));
        } else {
            if let Some(tag) = &filter.tag {
                clauses.push("EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?)");
                params.push(Box::new(tag.clone()));
            }
            if let Some(start) = filter.start {
                clauses.push("timestamp >= ?");
                params.push(Box::new(start.timestamp()));
            }
            if let Some(end) = filter.end {
                clauses.push("timestamp <= ?");
                params.push(Box::new(end.timestamp()));
            }
        }

        let mut sql = "SELECT note_id, title, content, tags, timestamp FROM notes".to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp ASC, note_id ASC");

        let notes = self.db.with_conn(|conn| {
            let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let mut stmt = conn.prepare(&sql).map_err(storage_err("Note query prepare"))?;
            let rows = stmt
                .query_map(params_refs.as_slice(), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })
                .map_err(storage_err("Note query"))?;

            let mut notes = Vec::new();
            for row in rows {
                let (note_id, title, content, tags, ts) = row.map_err(storage_err("Note row"))?;
                notes.push(NoteRecord {
                    note_id,
                    title,
                    content,
                    tags: serde_json::from_str(&tags)?,
                    timestamp: secs_to_utc(ts),
                });
            }
            Ok(notes)
        })?;

        match (&filter.keyword, filter.note_id) {
            (Some(keyword), None) => {
                let needle = keyword.to_lowercase();
                Ok(notes
                    .into_iter()
                    .filter(|n| n.content.to_lowercase().contains(&needle))
                    .collect())
            }
            _ => Ok(notes),
        }
    }

    /// Apply a partial update. Returns false when the note does not exist.
    pub fn update(&self, note_id: i64, update: &NoteUpdate) -> Result<bool, AuraError> {
        let tags_json = update
            .tags
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE notes SET
                        title = COALESCE(?2, title),
                        content = COALESCE(?3, content),
                        tags = COALESCE(?4, tags)
                     WHERE note_id = ?1",
                    rusqlite::params![note_id, update.title, update.content, tags_json],
                )
                .map_err(storage_err("Failed to update note"))?;
            Ok(changed > 0)
        })
    }

    pub fn delete(&self, note_id: i64) -> Result<bool, AuraError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute("DELETE FROM notes WHERE note_id = ?1", [note_id])
                .map_err(storage_err("Failed to delete note"))?;
            Ok(changed > 0)
        })
    }
}

// ============================================================================
// Meetings
// ============================================================================

/// Repository for meeting summaries, keyed by title.
#[derive(Debug, Clone)]
pub struct MeetingRepository {
    db: Arc<Database>,
}

impl MeetingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn save(&self, meeting: &MeetingSummary) -> Result<(), AuraError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO meeting_summaries (title, transcript, summary, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    meeting.title,
                    meeting.transcript,
                    meeting.summary,
                    meeting.created_at.timestamp(),
                ],
            )
            .map_err(storage_err("Failed to save meeting"))?;
            Ok(())
        })
    }

    pub fn get(&self, title: &str) -> Result<Option<MeetingSummary>, AuraError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT title, transcript, summary, created_at
                 FROM meeting_summaries WHERE title = ?1",
                [title],
                row_to_meeting,
            )
            .optional()
            .map_err(storage_err("Failed to load meeting"))
        })
    }

    /// All meetings, newest first.
    pub fn list(&self) -> Result<Vec<MeetingSummary>, AuraError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT title, transcript, summary, created_at
                     FROM meeting_summaries ORDER BY created_at DESC, title ASC",
                )
                .map_err(storage_err("Meeting query prepare"))?;
            let rows = stmt
                .query_map([], row_to_meeting)
                .map_err(storage_err("Meeting query"))?;
            let meetings = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err("Meeting row"))?;
            Ok(meetings)
        })
    }
}

fn row_to_meeting(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingSummary> {
    Ok(MeetingSummary {
        title: row.get(0)?,
        transcript: row.get(1)?,
        summary: row.get(2)?,
        created_at: secs_to_utc(row.get(3)?),
    })
}

// ============================================================================
// Preferences
// ============================================================================

/// Per-user key/value preferences.
#[derive(Debug, Clone)]
pub struct PreferenceRepository {
    db: Arc<Database>,
}

impl PreferenceRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn set(&self, user_id: &str, preference_type: &str, value: &str) -> Result<(), AuraError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_preferences (user_id, preference_type, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, preference_type) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                rusqlite::params![user_id, preference_type, value, Utc::now().timestamp()],
            )
            .map_err(storage_err("Failed to save preference"))?;
            Ok(())
        })
    }

    pub fn get(&self, user_id: &str, preference_type: &str) -> Result<Option<String>, AuraError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM user_preferences WHERE user_id = ?1 AND preference_type = ?2",
                [user_id, preference_type],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err("Failed to load preference"))
        })
    }

    pub fn all(&self, user_id: &str) -> Result<BTreeMap<String, String>, AuraError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT preference_type, value FROM user_preferences WHERE user_id = ?1")
                .map_err(storage_err("Preference query prepare"))?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(storage_err("Preference query"))?;
            let prefs = rows
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map_err(storage_err("Preference row"))?;
            Ok(prefs)
        })
    }
}

// ============================================================================
// Custom commands
// ============================================================================

#[derive(Debug, Clone)]
pub struct CustomCommandRepository {
    db: Arc<Database>,
}

impl CustomCommandRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn save(&self, command: &CustomCommand) -> Result<(), AuraError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO custom_commands (name, description, action, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    command.name,
                    command.description,
                    command.action,
                    command.created_at.timestamp(),
                ],
            )
            .map_err(storage_err("Failed to save custom command"))?;
            Ok(())
        })
    }

    pub fn get(&self, name: &str) -> Result<Option<CustomCommand>, AuraError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT name, description, action, created_at FROM custom_commands WHERE name = ?1",
                [name],
                row_to_custom_command,
            )
            .optional()
            .map_err(storage_err("Failed to load custom command"))
        })
    }

    pub fn list(&self) -> Result<Vec<CustomCommand>, AuraError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT name, description, action, created_at FROM custom_commands ORDER BY name")
                .map_err(storage_err("Custom command query prepare"))?;
            let rows = stmt
                .query_map([], row_to_custom_command)
                .map_err(storage_err("Custom command query"))?;
            let commands = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err("Custom command row"))?;
            Ok(commands)
        })
    }
}

fn row_to_custom_command(row: &rusqlite::Row<'_>) -> rusqlite::Result<CustomCommand> {
    Ok(CustomCommand {
        name: row.get(0)?,
        description: row.get(1)?,
        action: row.get(2)?,
        created_at: secs_to_utc(row.get(3)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn task_due(title: &str, priority: &str, deadline: Option<DateTime<Utc>>) -> TaskRecord {
        let mut task = TaskRecord::new(title, priority, "personal");
        task.deadline = deadline;
        task
    }

    // ---- Tasks ----

    #[test]
    fn test_task_upsert_and_find() {
        let repo = TaskRepository::new(make_db());
        let mut task = TaskRecord::new("Buy groceries", "medium", "personal");
        task.deadline_text = Some("tomorrow".to_string());
        repo.upsert(&task).unwrap();

        let found = repo.find("Buy groceries").unwrap().unwrap();
        assert_eq!(found.priority, "medium");
        assert_eq!(found.deadline_text.as_deref(), Some("tomorrow"));
        assert!(repo.find("Nope").unwrap().is_none());
    }

    #[test]
    fn test_task_upsert_replaces_by_title() {
        let repo = TaskRepository::new(make_db());
        repo.upsert(&TaskRecord::new("Report", "low", "work")).unwrap();
        repo.upsert(&TaskRecord::new("Report", "high", "work")).unwrap();

        assert_eq!(repo.by_priority("high").unwrap().len(), 1);
        assert!(repo.by_priority("low").unwrap().is_empty());
    }

    #[test]
    fn test_task_filters() {
        let repo = TaskRepository::new(make_db());
        repo.upsert(&TaskRecord::new("a", "high", "work")).unwrap();
        repo.upsert(&TaskRecord::new("b", "low", "personal")).unwrap();
        repo.upsert(&TaskRecord::new("c", "high", "personal")).unwrap();

        assert_eq!(repo.by_priority("HIGH").unwrap().len(), 2);
        let personal: Vec<String> = repo
            .by_category("personal")
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(personal.len(), 2);
        assert!(personal.contains(&"b".to_string()));
    }

    #[test]
    fn test_task_due_before_orders_by_deadline() {
        let repo = TaskRepository::new(make_db());
        let now = Utc::now();
        repo.upsert(&task_due("later", "low", Some(now + Duration::days(3)))).unwrap();
        repo.upsert(&task_due("sooner", "low", Some(now + Duration::days(1)))).unwrap();
        repo.upsert(&task_due("far", "low", Some(now + Duration::days(30)))).unwrap();
        repo.upsert(&task_due("none", "low", None)).unwrap();

        let due: Vec<String> = repo
            .due_before(now + Duration::days(7))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(due, vec!["sooner".to_string(), "later".to_string()]);
    }

    #[test]
    fn test_task_urgent_includes_high_priority_and_due_soon() {
        let repo = TaskRepository::new(make_db());
        let now = Utc::now();
        repo.upsert(&task_due("high-no-deadline", "high", None)).unwrap();
        repo.upsert(&task_due("due-soon", "low", Some(now + Duration::hours(2)))).unwrap();
        repo.upsert(&task_due("relaxed", "low", Some(now + Duration::days(5)))).unwrap();

        let urgent: Vec<String> = repo
            .urgent(now + Duration::days(1))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(urgent, vec!["due-soon".to_string(), "high-no-deadline".to_string()]);
    }

    #[test]
    fn test_task_notifications_only_once() {
        let repo = TaskRepository::new(make_db());
        let now = Utc::now();
        repo.upsert(&task_due("standup", "medium", Some(now + Duration::minutes(10)))).unwrap();

        let pending = repo.pending_notifications(now, now + Duration::hours(1)).unwrap();
        assert_eq!(pending.len(), 1);

        repo.mark_notified("standup").unwrap();
        assert!(repo
            .pending_notifications(now, now + Duration::hours(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_task_delete() {
        let repo = TaskRepository::new(make_db());
        repo.upsert(&TaskRecord::new("x", "low", "work")).unwrap();
        assert!(repo.delete("x").unwrap());
        assert!(!repo.delete("x").unwrap());
    }

    // ---- Notes ----

    #[test]
    fn test_note_ids_are_sequential() {
        let repo = NoteRepository::new(make_db());
        let a = repo.add("A", "alpha", &[]).unwrap();
        let b = repo.add("B", "beta", &[]).unwrap();
        assert_eq!(a.note_id, 1);
        assert_eq!(b.note_id, 2);
        assert_eq!(repo.get(2).unwrap().unwrap().title, "B");
    }

    #[test]
    fn test_note_query_by_tag_and_keyword() {
        let repo = NoteRepository::new(make_db());
        repo.add("Meeting", "Discussed project updates", &["work".to_string()]).unwrap();
        repo.add("Shopping", "Milk and eggs", &["home".to_string()]).unwrap();
        repo.add("Roadmap", "Project timeline", &["work".to_string(), "plan".to_string()])
            .unwrap();

        let work = repo
            .query(&NoteFilter {
                tag: Some("work".to_string()),
                ..NoteFilter::default()
            })
            .unwrap();
        assert_eq!(work.len(), 2);

        let project = repo
            .query(&NoteFilter {
                keyword: Some("PROJECT".to_string()),
                ..NoteFilter::default()
            })
            .unwrap();
        let titles: Vec<&str> = project.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Meeting", "Roadmap"]);
    }

    #[test]
    fn test_note_query_by_date_range() {
        let repo = NoteRepository::new(make_db());
        repo.add("Now", "content", &[]).unwrap();
        let now = Utc::now();

        let hit = repo
            .query(&NoteFilter {
                start: Some(now - Duration::hours(1)),
                end: Some(now + Duration::hours(1)),
                ..NoteFilter::default()
            })
            .unwrap();
        assert_eq!(hit.len(), 1);

        let miss = repo
            .query(&NoteFilter {
                start: Some(now - Duration::days(10)),
                end: Some(now - Duration::days(9)),
                ..NoteFilter::default()
            })
            .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn test_note_partial_update() {
        let repo = NoteRepository::new(make_db());
        let note = repo.add("Old", "Body", &["a".to_string()]).unwrap();

        let updated = repo
            .update(
                note.note_id,
                &NoteUpdate {
                    title: Some("New".to_string()),
                    ..NoteUpdate::default()
                },
            )
            .unwrap();
        assert!(updated);

        let reloaded = repo.get(note.note_id).unwrap().unwrap();
        assert_eq!(reloaded.title, "New");
        assert_eq!(reloaded.content, "Body");
        assert_eq!(reloaded.tags, vec!["a".to_string()]);
        assert!(!repo.update(99, &NoteUpdate::default()).unwrap());
    }

    #[test]
    fn test_note_delete() {
        let repo = NoteRepository::new(make_db());
        let note = repo.add("T", "C", &[]).unwrap();
        assert!(repo.delete(note.note_id).unwrap());
        assert!(repo.get(note.note_id).unwrap().is_none());
    }

    // ---- Meetings, preferences, custom commands ----

    #[test]
    fn test_meeting_save_get_list() {
        let repo = MeetingRepository::new(make_db());
        let meeting = MeetingSummary {
            title: "Sprint review".to_string(),
            transcript: "We shipped.".to_string(),
            summary: "Shipped.".to_string(),
            created_at: Utc::now(),
        };
        repo.save(&meeting).unwrap();

        assert_eq!(repo.get("Sprint review").unwrap().unwrap().summary, "Shipped.");
        assert_eq!(repo.list().unwrap().len(), 1);
        assert!(repo.get("Other").unwrap().is_none());
    }

    #[test]
    fn test_preferences_upsert() {
        let repo = PreferenceRepository::new(make_db());
        repo.set("u1", "news_category", "sports").unwrap();
        repo.set("u1", "news_category", "technology").unwrap();
        repo.set("u1", "music", "jazz").unwrap();

        assert_eq!(repo.get("u1", "news_category").unwrap().as_deref(), Some("technology"));
        assert_eq!(repo.all("u1").unwrap().len(), 2);
        assert!(repo.all("u2").unwrap().is_empty());
    }

    #[test]
    fn test_custom_commands() {
        let repo = CustomCommandRepository::new(make_db());
        repo.save(&CustomCommand {
            name: "backup".to_string(),
            description: "Back up notes".to_string(),
            action: "echo backup".to_string(),
            created_at: Utc::now(),
        })
        .unwrap();

        assert_eq!(repo.get("backup").unwrap().unwrap().action, "echo backup");
        assert_eq!(repo.list().unwrap().len(), 1);
    }
}
