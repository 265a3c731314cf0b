//! Personalized recommendations from stored preferences and tasks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::seq::IndexedRandom;
use serde_json::{json, Value};

use aura_core::config::RecommendationsConfig;
use aura_core::types::{Intent, ModuleKind};
use aura_llm::SharedModel;
use aura_storage::{PreferenceRepository, TaskRepository};

use super::{command_of, ModuleHandler};
use crate::client::NewsProvider;
use crate::error::ModuleError;
use crate::types::HandlerContext;

const NEWS_CATEGORY: &str = "news_category";

pub struct RecommendationHandler {
    preferences: PreferenceRepository,
    tasks: TaskRepository,
    news: Arc<dyn NewsProvider>,
    model: SharedModel,
    config: RecommendationsConfig,
}

#[derive(Debug, PartialEq, Eq)]
enum Kind {
    SetPreference,
    News,
    Tasks,
    General,
}

fn kind_of(intent: &Intent) -> Kind {
    let command = command_of(intent);
    if command.contains("set") || command.contains("preference") {
        Kind::SetPreference
    } else if command.contains("news") {
        Kind::News
    } else if command.contains("task") {
        Kind::Tasks
    } else {
        Kind::General
    }
}

impl RecommendationHandler {
    pub fn new(
        preferences: PreferenceRepository,
        tasks: TaskRepository,
        news: Arc<dyn NewsProvider>,
        model: SharedModel,
        config: RecommendationsConfig,
    ) -> Self {
        Self {
            preferences,
            tasks,
            news,
            model,
            config,
        }
    }

    fn user(&self) -> &str {
        &self.config.user_id
    }

    fn set_preference(&self, intent: &Intent) -> Result<Value, ModuleError> {
        let (Some(kind), Some(value)) = (
            intent.payload_str("preference_type"),
            intent.payload_str("preference"),
        ) else {
            return Err(ModuleError::InvalidPayload(
                "preference_type and preference are required".to_string(),
            ));
        };
        self.preferences.set(self.user(), kind, value)?;
        Ok(json!({
            "status": "success",
            "message": format!("Preference '{kind}' set to '{value}'."),
        }))
    }

    async fn news(&self) -> Result<Value, ModuleError> {
        let category = match self.preferences.get(self.user(), NEWS_CATEGORY)? {
            Some(category) => category,
            None => self
                .config
                .interest_categories
                .choose(&mut rand::rng())
                .cloned()
                .unwrap_or_else(|| "general".to_string()),
        };
        let articles = self.news.top_headlines(&category).await?;
        let titles: Vec<String> = articles.into_iter().map(|a| a.title).collect();
        Ok(json!({ "category": category, "recommendations": titles }))
    }

    fn tasks(&self) -> Result<Value, ModuleError> {
        let urgent = self.tasks.urgent(Utc::now() + Duration::days(1))?;
        let titles: Vec<String> = if urgent.is_empty() {
            vec!["No urgent tasks!".to_string()]
        } else {
            urgent.into_iter().map(|t| t.title).collect()
        };
        Ok(json!({ "recommendations": titles }))
    }

    async fn general(&self) -> Result<Value, ModuleError> {
        let prefs = self.preferences.all(self.user())?;
        if prefs.is_empty() {
            return Ok(json!({
                "recommendations": "Welcome! Set some preferences to get personalized recommendations."
            }));
        }
        let listed = prefs
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        let reply = self
            .model
            .generate(&format!(
                "User preferences are: {listed}. Suggest some activities or recommendations, don't ask any questions."
            ))
            .await?;
        Ok(json!({ "recommendations": reply.trim() }))
    }
}

#[async_trait]
impl ModuleHandler for RecommendationHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Recommendation
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        match kind_of(intent) {
            Kind::SetPreference => self.set_preference(intent),
            Kind::News => self.news().await,
            Kind::Tasks => self.tasks(),
            Kind::General => self.general().await,
        }
    }

    fn describe(&self, intent: &Intent) -> String {
        format!("Recommend ({:?})", kind_of(intent))
    }
}
