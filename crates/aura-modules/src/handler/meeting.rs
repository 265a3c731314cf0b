//! Meeting summaries.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};
use aura_llm::SharedModel;
use aura_storage::{MeetingRepository, MeetingSummary};

use super::document::find_by_stem;
use super::{command_of, safe_file_name, ModuleHandler};
use crate::error::ModuleError;
use crate::types::HandlerContext;

pub struct MeetingHandler {
    meetings: MeetingRepository,
    model: SharedModel,
    transcript_dir: PathBuf,
}

impl MeetingHandler {
    pub fn new(meetings: MeetingRepository, model: SharedModel, transcript_dir: PathBuf) -> Self {
        Self {
            meetings,
            model,
            transcript_dir,
        }
    }

    async fn transcript(&self, intent: &Intent) -> Result<Option<String>, ModuleError> {
        if let Some(text) = intent.payload_str("transcript") {
            return Ok(Some(text.to_string()));
        }
        let Some(file_name) = intent.payload_str("file_name") else {
            return Ok(None);
        };
        let name = safe_file_name(file_name)?;
        match find_by_stem(&self.transcript_dir, name).await? {
            Some(path) => Ok(Some(tokio::fs::read_to_string(path).await?)),
            None => Ok(None),
        }
    }

    async fn summarize(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let title = intent
            .payload_str("title")
            .ok_or_else(|| ModuleError::InvalidPayload("meeting title is required".to_string()))?;
        let Some(transcript) = self.transcript(intent).await? else {
            return Ok(json!({ "error": "No transcript provided for the meeting." }));
        };

        let summary = self
            .model
            .generate(&format!(
                "Summarize the following meeting transcript, briefly : {transcript}"
            ))
            .await?;
        let record = MeetingSummary {
            title: title.to_string(),
            transcript,
            summary: summary.trim().to_string(),
            created_at: Utc::now(),
        };
        self.meetings.save(&record)?;

        tracing::info!(title, "Meeting summarized");
        Ok(json!({ "status": "success", "title": record.title, "summary": record.summary }))
    }
}

#[async_trait]
impl ModuleHandler for MeetingHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Meeting
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        let command = command_of(intent);
        if command.contains("summar") || command.contains("transcri") {
            return self.summarize(intent).await;
        }
        if command.contains("list") || command.contains("all") {
            return Ok(json!({ "meetings": self.meetings.list()? }));
        }
        if command.contains("retrieve") || command.contains("get") {
            let title = intent.payload_str_or("title", "");
            return match self.meetings.get(title)? {
                Some(meeting) => Ok(json!({ "meeting": meeting })),
                None => Ok(json!({ "error": format!("Meeting '{title}' not found.") })),
            };
        }
        Ok(json!({ "error": "Meeting action not recognized." }))
    }

    fn describe(&self, intent: &Intent) -> String {
        format!(
            "Meeting {} '{}'",
            command_of(intent),
            intent.payload_str_or("title", "")
        )
    }
}
