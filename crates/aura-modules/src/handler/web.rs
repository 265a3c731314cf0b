//! Web search handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};
use aura_llm::SharedModel;

use super::{command_of, ModuleHandler};
use crate::client::SearchProvider;
use crate::error::ModuleError;
use crate::types::HandlerContext;

const NO_DESCRIPTION: &str = "No description available.";

pub struct WebHandler {
    search: Arc<dyn SearchProvider>,
    model: SharedModel,
}

impl WebHandler {
    pub fn new(search: Arc<dyn SearchProvider>, model: SharedModel) -> Self {
        Self { search, model }
    }
}

fn wants_summary(intent: &Intent) -> bool {
    command_of(intent).contains("summar")
        || intent
            .payload_str("action")
            .is_some_and(|a| a.eq_ignore_ascii_case("summarize"))
}

#[async_trait]
impl ModuleHandler for WebHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Web
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        let Some(query) = intent.payload_str("query") else {
            return Ok(json!({ "error": "Query is required for web browsing." }));
        };

        let hits = self.search.search(query).await?;
        if hits.is_empty() {
            return Ok(json!({ "error": "No results found." }));
        }

        if wants_summary(intent) {
            let text = hits
                .iter()
                .filter_map(|h| h.snippet.as_deref())
                .collect::<Vec<_>>()
                .join(" ");
            if text.trim().is_empty() {
                return Ok(json!({ "summary": "No content available for summarization." }));
            }
            let summary = self
                .model
                .generate(&format!("Summarize the following text: {text}"))
                .await?;
            return Ok(json!({ "summary": summary.trim() }));
        }

        let results: Vec<Value> = hits
            .into_iter()
            .map(|hit| {
                json!({
                    "title": hit.title,
                    "link": hit.link,
                    "snippet": hit.snippet.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                })
            })
            .collect();
        Ok(json!({ "results": results }))
    }

    fn describe(&self, intent: &Intent) -> String {
        format!("Search the web for '{}'", intent.payload_str_or("query", ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aura_llm::ScriptedModel;

    use crate::client::SearchHit;
    use crate::handler::test_support;

    struct FakeSearch(Vec<SearchHit>);

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, ModuleError> {
            Ok(self.0.clone())
        }
    }

    fn hit(title: &str, snippet: Option<&str>) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            link: format!("https://example.com/{}", title.to_lowercase()),
            snippet: snippet.map(str::to_string),
        }
    }

    fn handler(hits: Vec<SearchHit>, script: ScriptedModel) -> (WebHandler, Arc<ScriptedModel>) {
        let (recorder, model) = test_support::model(script);
        (WebHandler::new(Arc::new(FakeSearch(hits)), model), recorder)
    }

    async fn run(handler: &WebHandler, command: &str, payload: Value) -> Value {
        handler
            .execute(&Intent::new("web", command, payload), &HandlerContext::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_results_fill_missing_snippet() {
        let (handler, _) = handler(
            vec![hit("Rust", Some("Systems language")), hit("Ferris", None)],
            ScriptedModel::new(),
        );
        let result = run(&handler, "search", json!({"query": "rust"})).await;
        assert_eq!(result["results"][0]["snippet"], "Systems language");
        assert_eq!(result["results"][1]["snippet"], NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_empty_query() {
        let (handler, _) = handler(vec![], ScriptedModel::new());
        let result = run(&handler, "search", json!({"query": "  "})).await;
        assert_eq!(result, json!({"error": "Query is required for web browsing."}));
    }

    #[tokio::test]
    async fn test_no_results() {
        let (handler, _) = handler(vec![], ScriptedModel::new());
        let result = run(&handler, "search", json!({"query": "zzqx"})).await;
        assert_eq!(result, json!({"error": "No results found."}));
    }

    #[tokio::test]
    async fn test_summarize_joins_snippets() {
        let (handler, recorder) = handler(
            vec![hit("A", Some("First.")), hit("B", None), hit("C", Some("Second."))],
            ScriptedModel::new().reply("Two facts."),
        );
        let result = run(&handler, "search", json!({"query": "x", "action": "summarize"})).await;
        assert_eq!(result, json!({"summary": "Two facts."}));
        assert_eq!(
            recorder.calls()[0].message,
            "Summarize the following text: First. Second."
        );
    }

    #[tokio::test]
    async fn test_summarize_without_snippets() {
        let (handler, recorder) = handler(vec![hit("A", None)], ScriptedModel::new());
        let result = run(&handler, "summarize", json!({"query": "x"})).await;
        assert_eq!(result["summary"], "No content available for summarization.");
        assert_eq!(recorder.call_count(), 0);
    }
}
