//! NewsAPI top headlines.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use aura_core::config::NewsConfig;

use super::{ensure_success, require, transport_error};
use crate::error::ModuleError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn top_headlines(&self, category: &str) -> Result<Vec<Article>, ModuleError>;
}

pub struct NewsApiClient {
    client: Client,
    config: NewsConfig,
    timeout_secs: u64,
}

impl NewsApiClient {
    pub fn new(client: Client, config: NewsConfig, timeout_secs: u64) -> Self {
        Self {
            client,
            config,
            timeout_secs,
        }
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn top_headlines(&self, category: &str) -> Result<Vec<Article>, ModuleError> {
        require(&self.config.api_key, "news api_key")?;

        let page_size = self.config.page_size.to_string();
        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("country", self.config.country.as_str()),
                ("category", category),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error("NewsAPI", self.timeout_secs))?;

        let body: HeadlinesResponse = ensure_success("NewsAPI", response)
            .await?
            .json()
            .await
            .map_err(|e| ModuleError::upstream("NewsAPI", e))?;

        Ok(body.articles)
    }
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}
