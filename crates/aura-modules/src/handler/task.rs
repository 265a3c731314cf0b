//! Task handler.
//!
//! Tasks are keyed by title. Priority and category are inferred by the
//! language model when a task is added.

use async_trait::async_trait;
use chrono::{Duration, Local, Utc};
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};
use aura_llm::SharedModel;
use aura_storage::{TaskRecord, TaskRepository};

use super::{command_of, ModuleHandler};
use crate::error::ModuleError;
use crate::time_parser::resolve_deadline;
use crate::types::HandlerContext;

pub struct TaskHandler {
    tasks: TaskRepository,
    model: SharedModel,
}

impl TaskHandler {
    pub fn new(tasks: TaskRepository, model: SharedModel) -> Self {
        Self { tasks, model }
    }

    async fn classify(&self, description: &str) -> (&'static str, &'static str) {
        let prompt = format!(
            "Classify this task. Answer with its priority (high, medium or low) \
             and its category (work or personal): {description}"
        );
        match self.model.generate(&prompt).await {
            Ok(reply) => classify_reply(&reply),
            Err(err) => {
                tracing::warn!(error = %err, "Task classification failed, using defaults");
                ("medium", "personal")
            }
        }
    }

    async fn add(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let description = intent
            .payload_str("description")
            .or_else(|| intent.payload_str("title"))
            .ok_or_else(|| ModuleError::InvalidPayload("task description is required".to_string()))?;

        let (priority, category) = self.classify(description).await;
        let mut task = TaskRecord::new(description, priority, category);
        if let Some(phrase) = intent.payload_str("deadline") {
            task.deadline = resolve_deadline(phrase, &Local::now());
            task.deadline_text = Some(phrase.to_string());
            if task.deadline.is_none() {
                tracing::debug!(phrase, "Deadline phrase not understood, keeping text only");
            }
        }
        self.tasks.upsert(&task)?;

        tracing::info!(title = %task.title, priority, category, "Task added");
        Ok(json!({
            "status": "success",
            "message": format!(
                "Task '{}' added with priority: {} and category: {}",
                task.title, priority, category
            ),
        }))
    }

    fn upcoming(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let cutoff = intent
            .payload_str("deadline")
            .and_then(|phrase| resolve_deadline(phrase, &Local::now()))
            .unwrap_or_else(|| Utc::now() + Duration::days(7));
        let tasks = self.tasks.due_before(cutoff)?;
        Ok(json!({ "tasks": tasks }))
    }

    fn delete(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let title = intent
            .payload_str("title")
            .or_else(|| intent.payload_str("description"))
            .ok_or_else(|| ModuleError::InvalidPayload("task title is required".to_string()))?;
        if !self.tasks.delete(title)? {
            return Ok(json!({ "error": format!("Task '{title}' not found.") }));
        }
        Ok(json!({
            "status": "success",
            "message": format!("Task '{title}' deleted successfully."),
        }))
    }
}

fn classify_reply(reply: &str) -> (&'static str, &'static str) {
    let reply = reply.to_lowercase();
    let priority = if reply.contains("high") {
        "high"
    } else if reply.contains("low") {
        "low"
    } else {
        "medium"
    };
    let category = if reply.contains("work") { "work" } else { "personal" };
    (priority, category)
}

#[async_trait]
impl ModuleHandler for TaskHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Task
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        match command_of(intent).as_str() {
            "add" | "create" | "schedule" => self.add(intent).await,
            "priority" => {
                let priority = intent.payload_str_or("priority", "high").to_lowercase();
                Ok(json!({ "tasks": self.tasks.by_priority(&priority)? }))
            }
            "category" => {
                let category = intent.payload_str_or("category", "personal").to_lowercase();
                Ok(json!({ "tasks": self.tasks.by_category(&category)? }))
            }
            "upcoming" | "deadline" => self.upcoming(intent),
            "delete" | "remove" => self.delete(intent),
            _ => Ok(json!({ "error": "Sorry, I didn't understand that command." })),
        }
    }

    fn describe(&self, intent: &Intent) -> String {
        match intent.payload_str("description").or_else(|| intent.payload_str("title")) {
            Some(title) => format!("Task {}: {}", command_of(intent), title),
            None => format!("Task {}", command_of(intent)),
        }
    }
}
