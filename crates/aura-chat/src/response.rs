//! Response synthesis.
//!
//! Turns a structured handler result into one or two spoken-style
//! sentences with a single language-model call. Error results and bare
//! status confirmations never reach the model.

use aura_core::types::{HandlerResult, ModuleKind, ResultKind};
use aura_llm::{clean_reply, SharedModel};

use crate::error::ChatError;

// =============================================================================
// Prompt catalogue
// =============================================================================

/// Expected result shape for one module command and the sentence it should become.
#[derive(Debug, Clone, Copy)]
pub struct FormatEntry {
    pub module: ModuleKind,
    pub command: &'static str,
    pub example: &'static str,
    pub sentence: &'static str,
}

const fn entry(
    module: ModuleKind,
    command: &'static str,
    example: &'static str,
    sentence: &'static str,
) -> FormatEntry {
    FormatEntry {
        module,
        command,
        example,
        sentence,
    }
}

pub const CATALOGUE: &[FormatEntry] = &[
    entry(
        ModuleKind::Task,
        "add",
        r#"{"status": "success", "message": "Task 'Finish report' added with priority: high and category: work"}"#,
        "I've added 'Finish report' as a high-priority work task.",
    ),
    entry(
        ModuleKind::Task,
        "priority / category / upcoming",
        r#"{"tasks": [{"title": "Finish report", "priority": "high", "deadline": "2025-03-03T09:00:00Z"}]}"#,
        "You have one high-priority task: 'Finish report', due March 3rd.",
    ),
    entry(
        ModuleKind::Task,
        "delete",
        r#"{"status": "success", "message": "Task 'Buy groceries' deleted successfully."}"#,
        "The task 'Buy groceries' has been deleted.",
    ),
    entry(
        ModuleKind::Web,
        "search",
        r#"{"results": [{"title": "Rust", "link": "https://www.rust-lang.org", "snippet": "A language empowering everyone."}]}"#,
        "The top result is 'Rust' at rust-lang.org: a language empowering everyone.",
    ),
    entry(
        ModuleKind::Web,
        "summarize",
        r#"{"summary": "Artificial intelligence is ..."}"#,
        "Here's a summary of what I found: artificial intelligence is ...",
    ),
    entry(
        ModuleKind::Note,
        "add / edit / delete",
        r#"{"message": "Note added successfully!", "note_id": 4}"#,
        "Your note has been saved as note number 4.",
    ),
    entry(
        ModuleKind::Note,
        "retrieve",
        r#"{"notes": [{"note_id": 4, "title": "Meeting Notes", "content": "Discussed project updates"}]}"#,
        "I found one note, 'Meeting Notes': discussed project updates.",
    ),
    entry(
        ModuleKind::Note,
        "summarize",
        r#"{"summary": "Project is on track."}"#,
        "In short: the project is on track.",
    ),
    entry(
        ModuleKind::Translate,
        "translate",
        r#"{"detected_language": "fr", "confidence": 0.98, "translated_text": "Hello"}"#,
        "That's French, and it means \"Hello\".",
    ),
    entry(
        ModuleKind::WeatherNews,
        "weather",
        r#"{"location": "Paris, France", "temperature": 18.0, "condition": "Partly cloudy", "humidity": 60, "wind_speed": 12.0}"#,
        "It's 18 degrees and partly cloudy in Paris, with 60% humidity and wind at 12 km/h.",
    ),
    entry(
        ModuleKind::WeatherNews,
        "news",
        r#"{"articles": [{"title": "Markets rally", "description": "Stocks closed higher."}]}"#,
        "Today's top headline: markets rally, as stocks closed higher.",
    ),
    entry(
        ModuleKind::Email,
        "fetch",
        r#"{"emails": [{"id": "18c2", "from": "Alice <alice@example.com>", "subject": "Lunch?", "snippet": "Are you free"}]}"#,
        "You have one new email from Alice about lunch.",
    ),
    entry(
        ModuleKind::Email,
        "send / reply",
        r#"{"message": "Message sent", "id": "18c3"}"#,
        "Your email has been sent.",
    ),
    entry(
        ModuleKind::Email,
        "summarize",
        r#"{"summary": "Alice asks whether you are free for lunch."}"#,
        "Alice is asking whether you're free for lunch.",
    ),
    entry(
        ModuleKind::Document,
        "create / edit / delete / move",
        r#"{"status": "success", "message": "File 'plan' created in documents."}"#,
        "I've created 'plan' in your documents folder.",
    ),
    entry(
        ModuleKind::Document,
        "retrieve / list / summarize / classify",
        r#"{"folder": "documents", "files": ["plan.txt", "budget.txt"]}"#,
        "Your documents folder has two files: plan and budget.",
    ),
    entry(
        ModuleKind::Entertainment,
        "play / pause / volume / seek",
        r#"{"status": "success", "platform": "spotify", "track": "Blue in Green"}"#,
        "Now playing 'Blue in Green' on Spotify.",
    ),
    entry(
        ModuleKind::Meeting,
        "summarize / retrieve / list",
        r#"{"status": "success", "title": "Standup", "summary": "Release moved to Friday."}"#,
        "Standup summary: the release moved to Friday.",
    ),
    entry(
        ModuleKind::Recommendation,
        "news / tasks / general",
        r#"{"category": "technology", "recommendations": ["New chip announced"]}"#,
        "From technology, you might like: new chip announced.",
    ),
    entry(
        ModuleKind::Custom,
        "create / execute / list",
        r#"{"status": "success", "exit_code": 0, "output": "done"}"#,
        "The command ran successfully and printed: done.",
    ),
];

/// Worked narrations shown to the model before the real request.
pub const FEW_SHOT: &[(&str, &str, &str)] = &[
    (
        "Delete the task titled 'Buy groceries'.",
        r#"{"status": "success", "message": "Task 'Buy groceries' deleted successfully."}"#,
        "The task 'Buy groceries' has been deleted successfully.",
    ),
    (
        "Show me the latest weather in Paris.",
        r#"{"location": "Paris, France", "temperature": 18.0, "condition": "Sunny", "humidity": 40, "wind_speed": 8.0}"#,
        "It's currently 18 degrees and sunny in Paris.",
    ),
    (
        "Show me notes about 'project' from last week.",
        r#"{"notes": []}"#,
        "I couldn't find any notes about 'project' from last week.",
    ),
];

// =============================================================================
// ResponseSynthesizer
// =============================================================================

/// Narrates handler results with the language model.
pub struct ResponseSynthesizer {
    model: SharedModel,
}

impl ResponseSynthesizer {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    /// Final text for a handler result.
    ///
    /// - `{error}` results become [`ChatError::Handler`] without a model call.
    /// - Status-only results are returned as their JSON text.
    /// - Everything else is narrated once. Failure yields
    ///   [`ChatError::Synthesis`] carrying the untouched result.
    pub async fn synthesize(
        &self,
        module: Option<ModuleKind>,
        raw_command: &str,
        result: &HandlerResult,
    ) -> Result<String, ChatError> {
        match result.kind() {
            ResultKind::Error => {
                let message = result.error_message().unwrap_or_default();
                return Err(ChatError::Handler(message));
            }
            ResultKind::StatusOnly => return Ok(result.to_string()),
            ResultKind::Narratable => {}
        }

        let prompt = build_prompt(module, raw_command, result);
        let reply = self.model.generate(&prompt).await.map_err(|e| {
            tracing::warn!(error = %e, "Narration failed");
            ChatError::Synthesis {
                message: e.to_string(),
                result: result.as_value().clone(),
            }
        })?;

        let text = clean_reply(&reply);
        if text.is_empty() {
            return Err(ChatError::Synthesis {
                message: "empty narration".to_string(),
                result: result.as_value().clone(),
            });
        }
        Ok(text)
    }
}

/// Prompt for one narration: catalogue rows for the module (or all rows
/// when unknown), the few-shot bank, then the live command and result.
pub fn build_prompt(module: Option<ModuleKind>, raw_command: &str, result: &HandlerResult) -> String {
    let mut prompt = String::from(
        "You are Aura, a voice assistant. Turn the structured result of the user's command \
         into a short, natural reply of one or two sentences. Use only facts present in the \
         result. Do not output JSON, markdown or quotation marks.\n\nOutput formats:\n",
    );
    for row in CATALOGUE
        .iter()
        .filter(|row| module.is_none_or(|m| row.module == m))
    {
        prompt.push_str(&format!(
            "- {} / {}: {} -> {}\n",
            row.module, row.command, row.example, row.sentence
        ));
    }

    prompt.push_str("\nExamples:\n");
    for (command, output, narration) in FEW_SHOT {
        prompt.push_str(&format!(
            "Command: {command}\nResult: {output}\nReply: {narration}\n\n"
        ));
    }

    prompt.push_str(&format!("Command: {raw_command}\nResult: {result}\nReply:"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aura_llm::{LlmError, ScriptedModel};
    use serde_json::json;

    fn synthesizer(script: ScriptedModel) -> (ResponseSynthesizer, Arc<ScriptedModel>) {
        let model = Arc::new(script);
        (ResponseSynthesizer::new(model.clone()), model)
    }

    // ---- short circuits ----

    #[tokio::test]
    async fn test_error_result_never_reaches_model() {
        let (synth, model) = synthesizer(ScriptedModel::always("should not be used"));
        let err = synth
            .synthesize(Some(ModuleKind::Task), "delete x", &HandlerResult::error("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Handler(ref m) if m == "X"));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_status_only_returns_json_text() {
        let (synth, model) = synthesizer(ScriptedModel::always("unused"));
        let result = HandlerResult::new(json!({"status": "success"}));
        let text = synth.synthesize(None, "pause", &result).await.unwrap();
        assert_eq!(text, r#"{"status":"success"}"#);
        assert_eq!(model.call_count(), 0);
    }

    // ---- narration ----

    #[tokio::test]
    async fn test_narrates_task_deletion() {
        let (synth, model) = synthesizer(
            ScriptedModel::new().reply("\"The task 'Buy groceries' has been deleted successfully.\""),
        );
        let result = HandlerResult::new(json!({
            "status": "success",
            "message": "Task 'Buy groceries' deleted successfully."
        }));

        let text = synth
            .synthesize(Some(ModuleKind::Task), "Delete the task titled 'Buy groceries'.", &result)
            .await
            .unwrap();
        assert!(text.contains("Buy groceries"));
        assert!(text.contains("deleted"));
        assert!(!text.starts_with('"'));

        let prompt = &model.calls()[0].message;
        assert!(prompt.contains("Command: Delete the task titled 'Buy groceries'."));
        assert!(prompt.ends_with(&format!("Result: {result}\nReply:")));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_cleaned() {
        let (synth, _) = synthesizer(ScriptedModel::new().reply("```\nIt's sunny in Paris.\n```"));
        let result = HandlerResult::new(json!({"location": "Paris, France", "condition": "Sunny"}));
        let text = synth
            .synthesize(Some(ModuleKind::WeatherNews), "weather in Paris", &result)
            .await
            .unwrap();
        assert_eq!(text, "It's sunny in Paris.");
    }

    #[tokio::test]
    async fn test_model_failure_keeps_result() {
        let (synth, _) = synthesizer(ScriptedModel::new().fail(LlmError::Timeout(30)));
        let result = HandlerResult::new(json!({"notes": []}));
        let err = synth
            .synthesize(Some(ModuleKind::Note), "show notes", &result)
            .await
            .unwrap_err();
        match err {
            ChatError::Synthesis { result: kept, .. } => assert_eq!(kept, json!({"notes": []})),
            other => panic!("expected synthesis error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_narration_is_error() {
        let (synth, _) = synthesizer(ScriptedModel::new().reply("   "));
        let result = HandlerResult::new(json!({"tasks": []}));
        assert!(matches!(
            synth.synthesize(None, "tasks", &result).await,
            Err(ChatError::Synthesis { .. })
        ));
    }

    // ---- prompt ----

    #[test]
    fn test_prompt_filters_catalogue_by_module() {
        let result = HandlerResult::new(json!({"articles": []}));
        let prompt = build_prompt(Some(ModuleKind::WeatherNews), "news", &result);
        assert!(prompt.contains("- weather_news / news:"));
        assert!(!prompt.contains("- email / fetch:"));

        let prompt = build_prompt(None, "news", &result);
        assert!(prompt.contains("- email / fetch:"));
    }

    #[test]
    fn test_catalogue_covers_every_module() {
        for kind in ModuleKind::ALL {
            assert!(CATALOGUE.iter().any(|row| row.module == kind), "no entry for {kind}");
        }
    }
}
