//! Scripted language model for tests.
//!
//! Replies are served in order. Every call is recorded so tests can assert
//! on the prompts and history that reached the model.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use aura_core::types::HistoryEntry;

use crate::error::LlmError;
use crate::model::LanguageModel;

/// One call observed by [`ScriptedModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub system: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub message: String,
}

/// A [`LanguageModel`] that replays canned replies.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model that answers every call with `reply` once the script runs out.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, err: LlmError) -> Self {
        self.push(Err(err));
        self
    }

    pub fn push(&self, reply: Result<String, LlmError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn next_reply(&self, call: RecordedCall) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        let scripted = self
            .replies
            .lock()
            .map_err(|e| LlmError::Request(format!("script lock poisoned: {e}")))?
            .pop_front();
        match (scripted, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(LlmError::Request("scripted model has no replies left".to_string())),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.next_reply(RecordedCall {
            system: None,
            history: Vec::new(),
            message: prompt.to_string(),
        })
    }

    async fn chat(
        &self,
        system: Option<&str>,
        history: &[HistoryEntry],
        message: &str,
    ) -> Result<String, LlmError> {
        self.next_reply(RecordedCall {
            system: system.map(str::to_string),
            history: history.to_vec(),
            message: message.to_string(),
        })
    }
}
