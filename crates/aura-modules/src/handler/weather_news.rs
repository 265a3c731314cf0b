//! Weather and news handler.
//!
//! One module covers both services; the command (or, failing that, the
//! module name and payload) decides which one is called.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};

use super::ModuleHandler;
use crate::client::{NewsProvider, WeatherProvider};
use crate::error::ModuleError;
use crate::types::HandlerContext;

const NEWS_WORDS: [&str; 3] = ["news", "headline", "article"];
const WEATHER_WORDS: [&str; 3] = ["weather", "forecast", "temperature"];

pub struct WeatherNewsHandler {
    weather: Arc<dyn WeatherProvider>,
    news: Arc<dyn NewsProvider>,
    default_location: String,
    default_category: String,
}

impl WeatherNewsHandler {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        news: Arc<dyn NewsProvider>,
        default_location: String,
        default_category: String,
    ) -> Self {
        Self {
            weather,
            news,
            default_location,
            default_category,
        }
    }
}

fn wants_news(intent: &Intent) -> bool {
    let command = intent.command.to_lowercase();
    if NEWS_WORDS.iter().any(|w| command.contains(w)) {
        return true;
    }
    if WEATHER_WORDS.iter().any(|w| command.contains(w)) {
        return false;
    }
    let module = intent.module.to_lowercase().replace("weather_news", "");
    NEWS_WORDS.iter().any(|w| module.contains(w)) || intent.payload.contains_key("category")
}

#[async_trait]
impl ModuleHandler for WeatherNewsHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::WeatherNews
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        if wants_news(intent) {
            let category = intent.payload_str_or("category", &self.default_category);
            let articles = self.news.top_headlines(category).await?;
            let articles: Vec<Value> = articles
                .into_iter()
                .map(|a| json!({ "title": a.title, "description": a.description }))
                .collect();
            return Ok(json!({ "articles": articles }));
        }

        let location = intent.payload_str_or("location", &self.default_location);
        let report = self.weather.current(location).await?;
        Ok(json!({
            "location": report.location,
            "temperature": report.temperature,
            "condition": report.condition,
            "humidity": report.humidity,
            "wind_speed": report.wind_speed,
        }))
    }

    fn describe(&self, intent: &Intent) -> String {
        if wants_news(intent) {
            format!(
                "Fetch {} headlines",
                intent.payload_str_or("category", &self.default_category)
            )
        } else {
            format!(
                "Fetch weather for {}",
                intent.payload_str_or("location", &self.default_location)
            )
        }
    }
}
