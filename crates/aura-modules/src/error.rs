//! Error types for the module handlers.

use aura_core::error::AuraError;
use aura_core::types::ModuleKind;
use aura_llm::LlmError;

/// Errors from handler execution and its outbound clients.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("Authorization required: {0}")]
    AuthRequired(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("{service} request failed: {message}")]
    Upstream { service: String, message: String },
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("{0}")]
    Disabled(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Handler timed out after {0} seconds")]
    Timeout(u64),
    #[error("No handler registered for module: {0}")]
    Unregistered(ModuleKind),
    #[error("Storage error: {0}")]
    Storage(#[from] AuraError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModuleError {
    pub fn upstream(service: &str, message: impl std::fmt::Display) -> Self {
        ModuleError::Upstream {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}

/// Delegated credentials are missing or were rejected.
///
/// The only failure that escapes registry dispatch; everything else becomes
/// an `{error}` result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Authorization required: {0}")]
pub struct AuthRequired(pub String);
