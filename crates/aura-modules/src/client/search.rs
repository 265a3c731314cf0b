//! Google Custom Search.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use aura_core::config::SearchConfig;

use super::{ensure_success, require, transport_error};
use crate::error::ModuleError;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ModuleError>;
}

pub struct GoogleSearchClient {
    client: Client,
    config: SearchConfig,
    timeout_secs: u64,
}

impl GoogleSearchClient {
    pub fn new(client: Client, config: SearchConfig, timeout_secs: u64) -> Self {
        Self {
            client,
            config,
            timeout_secs,
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ModuleError> {
        require(&self.config.api_key, "Google search api_key")?;
        require(&self.config.engine_id, "Google search engine_id")?;

        let num = self.config.num_results.to_string();
        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("cx", self.config.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error("Google Search", self.timeout_secs))?;

        let body: SearchResponse = ensure_success("Google Search", response)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream("Google Search", e))?;

        tracing::debug!(query, hits = body.items.len(), "Search completed");
        Ok(body.items)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}
