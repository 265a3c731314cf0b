//! Text translation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aura_llm::{strip_code_fences, SharedModel};

use crate::error::ModuleError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub detected_language: String,
    pub confidence: f64,
    pub translated_text: String,
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<Translation, ModuleError>;
}

/// Translator backed by the language model.
///
/// Asks for a JSON object; a reply that is not JSON is taken as the
/// translation itself with an unknown source language.
pub struct ModelTranslator {
    model: SharedModel,
}

impl ModelTranslator {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Translator for ModelTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<Translation, ModuleError> {
        let prompt = format!(
            "Translate the text below into the language with code '{target_language}'. \
             Respond with only a JSON object with the keys \"detected_language\" \
             (ISO 639-1 code of the source text), \"confidence\" (0 to 1) and \
             \"translated_text\".\n\nText: {text}"
        );
        let reply = self.model.generate(&prompt).await?;
        Ok(parse_translation(&reply))
    }
}

fn parse_translation(reply: &str) -> Translation {
    let cleaned = strip_code_fences(reply);
    serde_json::from_str(&cleaned).unwrap_or_else(|_| Translation {
        detected_language: "unknown".to_string(),
        confidence: 0.0,
        translated_text: cleaned,
    })
}
