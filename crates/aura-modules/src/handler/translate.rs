//! Translation handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};

use super::ModuleHandler;
use crate::client::Translator;
use crate::error::ModuleError;
use crate::types::HandlerContext;

pub struct TranslateHandler {
    translator: Arc<dyn Translator>,
}

impl TranslateHandler {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }
}

#[async_trait]
impl ModuleHandler for TranslateHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Translate
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        let Some(text) = intent.payload_str("text") else {
            return Ok(json!({ "error": "No text provided for translation." }));
        };
        let target = intent.payload_str_or("target_language", "en");
        let translation = self.translator.translate(text, target).await?;
        Ok(json!({
            "detected_language": translation.detected_language,
            "confidence": translation.confidence,
            "translated_text": translation.translated_text,
        }))
    }

    fn describe(&self, intent: &Intent) -> String {
        format!(
            "Translate text to {}",
            intent.payload_str_or("target_language", "en")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::client::Translation;

    #[derive(Default)]
    struct FakeTranslator {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(&self, text: &str, target: &str) -> Result<Translation, ModuleError> {
            self.seen
                .lock()
                .unwrap()
                .push((text.to_string(), target.to_string()));
            Ok(Translation {
                detected_language: "es".to_string(),
                confidence: 0.97,
                translated_text: "Hello".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_translate_defaults_to_english() {
        let fake = Arc::new(FakeTranslator::default());
        let handler = TranslateHandler::new(fake.clone());
        let result = handler
            .execute(
                &Intent::new("translate", "translate", json!({"text": "Hola"})),
                &HandlerContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({"detected_language": "es", "confidence": 0.97, "translated_text": "Hello"})
        );
        assert_eq!(fake.seen.lock().unwrap()[0], ("Hola".to_string(), "en".to_string()));
    }

    #[tokio::test]
    async fn test_translate_empty_text() {
        let handler = TranslateHandler::new(Arc::new(FakeTranslator::default()));
        let result = handler
            .execute(
                &Intent::new("translate", "translate", json!({"target_language": "fr"})),
                &HandlerContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"error": "No text provided for translation."}));
    }

    #[test]
    fn test_describe_target() {
        let handler = TranslateHandler::new(Arc::new(FakeTranslator::default()));
        let intent = Intent::new("translate", "translate", json!({"target_language": "de"}));
        assert_eq!(handler.describe(&intent), "Translate text to de");
    }
}
