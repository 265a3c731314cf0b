//! Language-model intent parser.
//!
//! Sends the raw command to the model together with the session's prior
//! turns and a fixed instruction template, then decodes the reply into an
//! [`Intent`]. A reply that is not a JSON object is a [`ChatError::Parse`]
//! carrying the offending text. Parsing is never retried.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use aura_core::types::{HistoryEntry, Intent};
use aura_llm::{strip_code_fences, SharedModel};

use crate::error::ChatError;

// =============================================================================
// Instruction template
// =============================================================================

/// System instruction describing every module, its commands and payloads.
pub const PARSER_TEMPLATE: &str = r#"Extract the required information from the user's command and return a JSON object.
The keys must match the fields expected by the assistant's modules and the values must be
extracted or inferred from the command. Leave out any value the command does not mention.
Tolerate minor grammatical or spelling errors in the command and assume the intended word.

Modules and their payloads:

1. Task management (module "task")
   - "add": {"description": string, "deadline": string (optional)}
   - "priority": {"priority": "high" | "medium" | "low"}
   - "category": {"category": "work" | "personal"}
   - "upcoming": {"deadline": string (optional)}
   - "delete": {"title": string}

2. Web browsing (module "web")
   - "search" / "summarize": {"query": string, "action": "summarize" when a summary is wanted}

3. Notes (module "note")
   - "add": {"title": string, "content": string, "tags": list (optional)}
   - "retrieve": {"note_id": number (optional), "keyword": string (optional), "tag": string (optional), "date_range": string (optional)}
   - "summarize": {"note_id": number}
   - "delete": {"note_id": number}
   - "edit": {"note_id": number, "new_title": string, "new_content": string, "new_tags": list (optional)}

4. Translation (module "translate")
   - "translate": {"text": string, "target_language": string (default "en")}

5. Weather and news (module "weather" or "news")
   - "weather": {"location": string (default "Zurich")}
   - "news": {"category": string such as "general", "business", "technology"}

6. Email (module "email")
   - "fetch": no payload
   - "send": {"to_email": string, "subject": string, "message_text": string}
   - "summarize": {"email_id": string}
   - "reply": {"email_id": string}

7. Documents (module "document")
   - "create" / "edit": {"file_name": string, "content": string, "folder": string (optional)}
   - "retrieve" / "delete" / "summarize" / "classify": {"file_name": string, "folder": string (optional)}
   - "move": {"file_name": string, "folder": string, "destination": string}
   - "list": {"folder": string (optional)}

8. Entertainment (module "entertainment")
   - "play": {"platform": "spotify" | "youtube" | "local", "query": string}
   - "pause", "resume", "next", "previous", "repeat": no payload
   - "volume up" / "volume down": no payload
   - "seek": {"position": string such as "1:30"}

9. Meetings (module "meeting")
   - "summarize": {"title": string, "transcript": string (optional), "file_name": string (optional)}
   - "retrieve": {"title": string}
   - "list": no payload

10. Recommendations (module "recommendation")
   - "news", "tasks", "general": no payload
   - "set_preference": {"preference_type": string, "preference": string}

11. Custom commands (module "custom")
   - "create": {"name": string, "description": string}
   - "execute": {"name": string}
   - "list": no payload

Return an object of this shape:
{"module": string, "command": string, "payload": object}
"module" names the module, "command" the action and "payload" the data described above.

Examples:

1. "Add a task with the description 'Finish report' and set the deadline to next Monday."
{"module": "task", "command": "add", "payload": {"description": "Finish report", "deadline": "next Monday"}}

2. "Show me the latest weather in Paris."
{"module": "weather", "command": "weather", "payload": {"location": "Paris"}}

3. "Please send an email to john.doe@example.com with the subject 'Meeting' and message 'Let's meet tomorrow'."
{"module": "email", "command": "send", "payload": {"to_email": "john.doe@example.com", "subject": "Meeting", "message_text": "Let's meet tomorrow"}}

4. "Get me the top 5 news headlines in the business category."
{"module": "news", "command": "news", "payload": {"category": "business"}}

5. "'Hola, ¿cómo estás?'"
{"module": "translate", "command": "translate", "payload": {"text": "Hola, ¿cómo estás?", "target_language": "en"}}

6. "Please add a note titled 'Meeting Notes' with the content 'Discussed project updates' and tagged 'work'."
{"module": "note", "command": "add", "payload": {"title": "Meeting Notes", "content": "Discussed project updates", "tags": ["work"]}}

7. "Show me notes about 'project' from last week."
{"module": "note", "command": "retrieve", "payload": {"keyword": "project", "date_range": "last week"}}

8. "Summarize the email with ID 12345."
{"module": "email", "command": "summarize", "payload": {"email_id": "12345"}}

9. "Delete the task titled 'Buy groceries'."
{"module": "task", "command": "delete", "payload": {"title": "Buy groceries"}}

10. "Fetch emails from my inbox."
{"module": "email", "command": "fetch", "payload": {}}

11. "Show me the weather forecast for New York City tomorrow."
{"module": "weather", "command": "weather", "payload": {"location": "New York City"}}

12. "Summarize the web search results about 'artificial intelligence'."
{"module": "web", "command": "summarize", "payload": {"query": "artificial intelligence", "action": "summarize"}}

13. "Translate 'Bonjour' into Spanish."
{"module": "translate", "command": "translate", "payload": {"text": "Bonjour", "target_language": "es"}}

14. "Which of my tasks are high priority?"
{"module": "task", "command": "priority", "payload": {"priority": "high"}}

15. "Fetch the top news in technology."
{"module": "news", "command": "news", "payload": {"category": "technology"}}

If no module applies, answer the message conversationally:

16. "Hello, how are you today?"
{"module": "", "message": "<your reply to the message>"}

Only return the JSON object. Write nothing before or after it."#;

static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{.*\}").unwrap_or_else(|e| panic!("invalid JSON object pattern: {e}"))
});

// =============================================================================
// IntentParser
// =============================================================================

/// A decoded intent together with the model's raw reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub intent: Intent,
    /// Unmodified model output. This is what the session log records.
    pub raw: String,
}

/// Turns raw command text into an [`Intent`] with the language model.
pub struct IntentParser {
    model: SharedModel,
}

impl IntentParser {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    /// Parse one command in the context of the session's prior turns.
    pub async fn parse(
        &self,
        history: &[HistoryEntry],
        command: &str,
    ) -> Result<ParsedCommand, ChatError> {
        let raw = self
            .model
            .chat(Some(PARSER_TEMPLATE), history, command)
            .await?;
        let intent = decode_intent(&raw)?;
        tracing::debug!(
            module = %intent.module,
            command = %intent.command,
            conversational = intent.is_conversational(),
            "Parsed intent"
        );
        Ok(ParsedCommand { intent, raw })
    }
}

/// Decode a model reply into an intent.
///
/// Code fences are stripped first. When prose surrounds the object, the
/// outermost `{...}` span is tried as a fallback.
pub fn decode_intent(raw: &str) -> Result<Intent, ChatError> {
    let text = strip_code_fences(raw);
    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(first) => JSON_OBJECT
            .find(&text)
            .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
            .ok_or_else(|| parse_error(first.to_string(), raw))?,
    };

    if !value.is_object() {
        return Err(parse_error("reply is not a JSON object", raw));
    }
    let mut intent: Intent =
        serde_json::from_value(value).map_err(|e| parse_error(e.to_string(), raw))?;
    intent.module = intent.module.trim().to_string();
    intent.command = intent.command.trim().to_string();
    Ok(intent)
}

fn parse_error(message: impl Into<String>, raw: &str) -> ChatError {
    ChatError::Parse {
        message: message.into(),
        raw: raw.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
