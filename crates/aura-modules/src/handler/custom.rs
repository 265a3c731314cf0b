//! User-defined shell commands.
//!
//! Commands are created from a plain-language description (the language
//! model proposes the shell line) and run later by name. Running is off
//! unless `custom.allow_execution` is set.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use aura_core::config::CustomConfig;
use aura_core::types::{Intent, ModuleKind};
use aura_llm::{clean_reply, SharedModel};
use aura_storage::{CustomCommand, CustomCommandRepository};

use super::{command_of, ModuleHandler};
use crate::error::ModuleError;
use crate::types::{HandlerContext, SafetyLevel};

pub struct CustomCommandHandler {
    commands: CustomCommandRepository,
    model: SharedModel,
    allow_execution: bool,
    shell: String,
}

impl CustomCommandHandler {
    pub fn new(commands: CustomCommandRepository, model: SharedModel, config: &CustomConfig) -> Self {
        Self {
            commands,
            model,
            allow_execution: config.allow_execution,
            shell: config.shell.clone(),
        }
    }

    async fn create(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let name = intent
            .payload_str("name")
            .ok_or_else(|| ModuleError::InvalidPayload("command name is required".to_string()))?;
        let description = intent.payload_str_or("description", name);

        let reply = self
            .model
            .generate(&format!(
                "Suggest a command that can be executed in shell and perform this action : {description}\n\
                 Only write the command and nothing else. not even quotation marks or endline characters."
            ))
            .await?;
        let action = clean_reply(&reply).lines().next().unwrap_or_default().trim().to_string();
        if action.is_empty() {
            return Ok(json!({ "error": "Could not derive a shell command." }));
        }

        self.commands.save(&CustomCommand {
            name: name.to_string(),
            description: description.to_string(),
            action: action.clone(),
            created_at: Utc::now(),
        })?;
        tracing::info!(name, %action, "Custom command saved");
        Ok(json!({ "status": "success", "name": name, "action": action }))
    }

    async fn run(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let name = intent
            .payload_str("name")
            .ok_or_else(|| ModuleError::InvalidPayload("command name is required".to_string()))?;
        let Some(command) = self.commands.get(name)? else {
            return Ok(json!({ "error": format!("Custom command '{name}' not found.") }));
        };
        if !self.allow_execution {
            return Err(ModuleError::Disabled(
                "Custom command execution is disabled (custom.allow_execution = false)".to_string(),
            ));
        }

        tracing::info!(name, action = %command.action, "Running custom command");
        let output = tokio::process::Command::new(&self.shell)
            .arg("-c")
            .arg(&command.action)
            .kill_on_drop(true)
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(json!({
            "status": if output.status.success() { "success" } else { "failed" },
            "exit_code": output.status.code(),
            "output": text.trim(),
        }))
    }
}

#[async_trait]
impl ModuleHandler for CustomCommandHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Custom
    }

    fn safety_level(&self) -> SafetyLevel {
        // Always Active: runs arbitrary shell lines.
        SafetyLevel::Active
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        let command = command_of(intent);
        if command.contains("create") || command.contains("add") || command.contains("define") {
            self.create(intent).await
        } else if command.contains("list") {
            Ok(json!({ "commands": self.commands.list()? }))
        } else if ["execute", "run", "perform", "launch", "start", "open"]
            .iter()
            .any(|w| command.contains(w))
        {
            self.run(intent).await
        } else {
            Ok(json!({ "error": "Custom command action not recognized." }))
        }
    }

    fn describe(&self, intent: &Intent) -> String {
        format!(
            "Custom command {} '{}'",
            command_of(intent),
            intent.payload_str_or("name", "")
        )
    }
}
