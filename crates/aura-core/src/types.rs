use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Enums
// =============================================================================

/// Handler categories the router can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Task,
    Web,
    Note,
    Translate,
    Email,
    WeatherNews,
    Document,
    Recommendation,
    Entertainment,
    Meeting,
    Custom,
}

impl ModuleKind {
    /// Every module kind, in default routing precedence.
    pub const ALL: [ModuleKind; 11] = [
        ModuleKind::Task,
        ModuleKind::Web,
        ModuleKind::Note,
        ModuleKind::Translate,
        ModuleKind::Email,
        ModuleKind::WeatherNews,
        ModuleKind::Document,
        ModuleKind::Recommendation,
        ModuleKind::Entertainment,
        ModuleKind::Meeting,
        ModuleKind::Custom,
    ];
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Task => write!(f, "task"),
            ModuleKind::Web => write!(f, "web"),
            ModuleKind::Note => write!(f, "note"),
            ModuleKind::Translate => write!(f, "translate"),
            ModuleKind::Email => write!(f, "email"),
            ModuleKind::WeatherNews => write!(f, "weather_news"),
            ModuleKind::Document => write!(f, "document"),
            ModuleKind::Recommendation => write!(f, "recommendation"),
            ModuleKind::Entertainment => write!(f, "entertainment"),
            ModuleKind::Meeting => write!(f, "meeting"),
            ModuleKind::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for ModuleKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(ModuleKind::Task),
            "web" => Ok(ModuleKind::Web),
            "note" => Ok(ModuleKind::Note),
            "translate" => Ok(ModuleKind::Translate),
            "email" => Ok(ModuleKind::Email),
            "weather_news" => Ok(ModuleKind::WeatherNews),
            "document" => Ok(ModuleKind::Document),
            "recommendation" => Ok(ModuleKind::Recommendation),
            "entertainment" => Ok(ModuleKind::Entertainment),
            "meeting" => Ok(ModuleKind::Meeting),
            "custom" => Ok(ModuleKind::Custom),
            _ => Err(format!("Unknown module kind: {}", s)),
        }
    }
}

/// Speaker of a history entry, in the language model's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// One completed request/response pair in a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: i64,
    /// Position within the session, starting at 1.
    pub seq: i64,
    pub timestamp: DateTime<Utc>,
    pub raw_command: String,
    pub response_text: String,
}

/// A flattened history line used to seed the language model context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

// =============================================================================
// Intent
// =============================================================================

/// Structured interpretation of a raw command.
///
/// An empty `module` marks a conversational reply carried in `message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub module: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub command: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A `null` field decodes as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Intent {
    /// Build a structured intent.
    pub fn new(module: impl Into<String>, command: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            module: module.into(),
            command: command.into(),
            payload,
            message: None,
        }
    }

    /// Build a conversational reply with no module.
    pub fn conversational(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_conversational(&self) -> bool {
        self.module.trim().is_empty()
    }

    /// Trimmed, non-empty string field from the payload.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// String field or the given default.
    pub fn payload_str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.payload_str(key).unwrap_or(default)
    }

    /// String list from the payload. A bare string is treated as a single tag.
    pub fn payload_list(&self, key: &str) -> Option<Vec<String>> {
        match self.payload.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
            _ => None,
        }
    }

    /// Lowercased module and command joined by a space, used for keyword matching.
    pub fn routing_text(&self) -> String {
        format!("{} {}", self.module, self.command).to_lowercase()
    }
}

// =============================================================================
// Handler results
// =============================================================================

/// Shape classification of a handler result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// `{error: ...}`. Terminal, surfaced without narration.
    Error,
    /// `{status}` and nothing else worth narrating.
    StatusOnly,
    /// Confirmations with detail, or domain records.
    Narratable,
}

/// Structured value returned by a module handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerResult(pub Value);

impl HandlerResult {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self(serde_json::json!({ "error": message.into() }))
    }

    pub fn kind(&self) -> ResultKind {
        let Some(map) = self.0.as_object() else {
            return ResultKind::Narratable;
        };
        if map.get("error").is_some_and(|v| !v.is_null()) {
            return ResultKind::Error;
        }
        if map.contains_key("status") && map.keys().all(|k| k == "status") {
            return ResultKind::StatusOnly;
        }
        ResultKind::Narratable
    }

    /// The error text when this is an error result.
    pub fn error_message(&self) -> Option<String> {
        if self.kind() != ResultKind::Error {
            return None;
        }
        self.0.get("error").map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(|v| v.as_str())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for HandlerResult {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for HandlerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Routing table entries
// =============================================================================

/// One row of the ordered dispatch table: a module and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub module: ModuleKind,
    pub keywords: Vec<String>,
}

impl RouteRule {
    pub fn new(module: ModuleKind, keywords: &[&str]) -> Self {
        Self {
            module,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Dispatch table in its default precedence order.
pub fn default_route_table() -> Vec<RouteRule> {
    vec![
        RouteRule::new(ModuleKind::Task, &["task", "reminder", "schedule"]),
        RouteRule::new(ModuleKind::Web, &["web", "search", "browse", "website"]),
        RouteRule::new(ModuleKind::Note, &["note", "record", "write"]),
        RouteRule::new(
            ModuleKind::Translate,
            &["translation", "translate", "language", "interpret"],
        ),
        RouteRule::new(ModuleKind::Email, &["email", "mail", "inbox"]),
        RouteRule::new(
            ModuleKind::WeatherNews,
            &["weather", "news", "headline", "article", "forecast", "temperature"],
        ),
        RouteRule::new(
            ModuleKind::Document,
            &["document", "file", "folder", "directory", "drive"],
        ),
        RouteRule::new(
            ModuleKind::Recommendation,
            &["recommendation", "suggestion", "advice"],
        ),
        RouteRule::new(
            ModuleKind::Entertainment,
            &[
                "entertainment",
                "music",
                "video",
                "movie",
                "spotify",
                "youtube",
                "play",
                "pause",
                "stop",
                "resume",
                "skip",
                "next",
                "previous",
                "volume",
                "repeat",
                "loop",
                "seek",
                "jump",
            ],
        ),
        RouteRule::new(
            ModuleKind::Meeting,
            &["meeting", "summary", "transcript", "transcribe"],
        ),
        RouteRule::new(
            ModuleKind::Custom,
            &["custom", "execute", "run", "perform", "open", "launch", "start"],
        ),
    ]
}

// =============================================================================
// Tests
// =============================================================================
