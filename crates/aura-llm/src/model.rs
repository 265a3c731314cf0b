use std::sync::Arc;

use async_trait::async_trait;

use aura_core::types::HistoryEntry;

use crate::error::LlmError;

/// A text-in, text-out language model.
///
/// `generate` is a single-turn call. `chat` replays prior turns as context
/// before sending `message`, optionally under a system instruction.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    async fn chat(
        &self,
        system: Option<&str>,
        history: &[HistoryEntry],
        message: &str,
    ) -> Result<String, LlmError>;
}

/// Shared handle injected into every component that needs the model.
pub type SharedModel = Arc<dyn LanguageModel>;
