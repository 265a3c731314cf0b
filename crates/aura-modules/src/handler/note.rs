//! Note handler.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};
use aura_llm::SharedModel;
use aura_storage::{NoteFilter, NoteRepository, NoteUpdate};

use super::{command_of, payload_i64, ModuleHandler};
use crate::error::ModuleError;
use crate::time_parser::resolve_range;
use crate::types::HandlerContext;

pub struct NoteHandler {
    notes: NoteRepository,
    model: SharedModel,
}

impl NoteHandler {
    pub fn new(notes: NoteRepository, model: SharedModel) -> Self {
        Self { notes, model }
    }

    fn add(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let content = intent.payload_str("content").unwrap_or_default();
        let title = intent
            .payload_str("title")
            .map(str::to_string)
            .unwrap_or_else(|| content.chars().take(40).collect());
        if title.is_empty() && content.is_empty() {
            return Err(ModuleError::InvalidPayload("note title or content is required".to_string()));
        }
        let tags = intent.payload_list("tags").unwrap_or_default();

        let note = self.notes.add(&title, content, &tags)?;
        tracing::info!(note_id = note.note_id, tags = tags.len(), "Note added");
        Ok(json!({ "message": "Note added successfully!", "note_id": note.note_id }))
    }

    fn retrieve(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let (start, end) = date_bounds(intent.payload.get("date_range"));
        let filter = NoteFilter {
            note_id: payload_i64(intent, "note_id"),
            tag: intent
                .payload_str("tag")
                .map(str::to_string)
                .or_else(|| intent.payload_list("tags").and_then(|t| t.into_iter().next())),
            start,
            end,
            keyword: intent.payload_str("keyword").map(str::to_string),
        };
        let notes = self.notes.query(&filter)?;
        Ok(json!({ "notes": notes }))
    }

    async fn summarize(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let note = match payload_i64(intent, "note_id") {
            Some(id) => self.notes.get(id)?,
            None => None,
        };
        let Some(note) = note else {
            return Ok(json!({ "error": "Note not found." }));
        };
        let summary = self
            .model
            .generate(&format!("Summarize the following text: {}", note.content))
            .await?;
        Ok(json!({ "summary": summary.trim() }))
    }

    fn delete(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let deleted = match payload_i64(intent, "note_id") {
            Some(id) => self.notes.delete(id)?,
            None => false,
        };
        if !deleted {
            return Ok(json!({ "error": "Note not found." }));
        }
        Ok(json!({ "message": "Note deleted successfully!" }))
    }

    fn edit(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let field = |key: &str| {
            intent
                .payload_str(&format!("new_{key}"))
                .or_else(|| intent.payload_str(key))
                .map(str::to_string)
        };
        let update = NoteUpdate {
            title: field("title"),
            content: field("content"),
            tags: intent
                .payload_list("new_tags")
                .or_else(|| intent.payload_list("tags")),
        };
        let updated = match payload_i64(intent, "note_id") {
            Some(id) => self.notes.update(id, &update)?,
            None => false,
        };
        if !updated {
            return Ok(json!({ "error": "Note not found." }));
        }
        Ok(json!({ "message": "Note updated successfully!" }))
    }
}

/// Bounds from a phrase ("last week") or an explicit `{start, end}` object.
fn date_bounds(value: Option<&Value>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match value {
        Some(Value::String(phrase)) => match resolve_range(phrase, &Local::now()) {
            Some(range) => (Some(range.start), Some(range.end)),
            None => {
                tracing::debug!(phrase = %phrase, "Unrecognized date range ignored");
                (None, None)
            }
        },
        Some(Value::Object(map)) => (
            map.get("start").and_then(Value::as_str).and_then(|s| parse_bound(s, false)),
            map.get("end").and_then(Value::as_str).and_then(|s| parse_bound(s, true)),
        ),
        _ => (None, None),
    }
}

fn parse_bound(text: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

#[async_trait]
impl ModuleHandler for NoteHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Note
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        match command_of(intent).as_str() {
            "add" | "create" | "write" | "record" => self.add(intent),
            "retrieve" | "get" | "find" | "search" | "list" => self.retrieve(intent),
            "summarize" => self.summarize(intent).await,
            "delete" | "remove" => self.delete(intent),
            "edit" | "update" => self.edit(intent),
            _ => Ok(json!({ "error": "Invalid action specified." })),
        }
    }

    fn describe(&self, intent: &Intent) -> String {
        match payload_i64(intent, "note_id") {
            Some(id) => format!("Note {} #{}", command_of(intent), id),
            None => format!("Note {}", command_of(intent)),
        }
    }
}
