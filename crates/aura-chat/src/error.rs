//! Error types for the command pipeline.

use aura_core::error::AuraError;
use aura_llm::LlmError;
use aura_modules::AuthRequired;

/// Errors from a single request cycle.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("command handling is disabled")]
    Disabled,
    #[error("Command is required.")]
    EmptyCommand,
    #[error("command exceeds maximum length of {0} characters")]
    CommandTooLong(usize),
    /// The model's reply could not be decoded into an intent.
    #[error("could not parse intent: {message}")]
    Parse { message: String, raw: String },
    #[error("{0}")]
    AuthRequired(String),
    /// A handler returned an `{error}` result.
    #[error("{0}")]
    Handler(String),
    /// Narration failed. `result` is the handler output that could not be narrated.
    #[error("response synthesis failed: {message}")]
    Synthesis {
        message: String,
        result: serde_json::Value,
    },
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("input error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Disabled => "disabled",
            ChatError::EmptyCommand | ChatError::CommandTooLong(_) => "invalid_command",
            ChatError::Parse { .. } => "parse_error",
            ChatError::AuthRequired(_) => "auth_required",
            ChatError::Handler(_) => "handler_error",
            ChatError::Synthesis { .. } => "synthesis_error",
            ChatError::Llm(_) => "llm_error",
            ChatError::Storage(_) => "storage_error",
            ChatError::Io(_) => "input_error",
        }
    }
}

impl From<AuraError> for ChatError {
    fn from(err: AuraError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        ChatError::Llm(err.to_string())
    }
}

impl From<AuthRequired> for ChatError {
    fn from(err: AuthRequired) -> Self {
        ChatError::AuthRequired(err.0)
    }
}
