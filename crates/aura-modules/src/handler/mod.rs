//! Module handler registry and trait definition.
//!
//! Defines the `ModuleHandler` async trait and the registry that dispatches
//! a parsed intent to the handler for its module, with a per-call timeout.

pub mod custom;
pub mod document;
pub mod email;
pub mod entertainment;
pub mod meeting;
pub mod note;
pub mod recommendation;
pub mod task;
pub mod translate;
pub mod weather_news;
pub mod web;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use aura_core::config::AuraConfig;
use aura_core::types::{HandlerResult, Intent, ModuleKind};
use aura_llm::SharedModel;
use aura_storage::{
    CustomCommandRepository, Database, MeetingRepository, NoteRepository, PreferenceRepository,
    TaskRepository,
};

use crate::client::{
    http_client, GmailClient, GoogleSearchClient, ModelTranslator, NewsApiClient,
    RapidWeatherClient, SpotifyController, YoutubeClient,
};
use crate::error::{AuthRequired, ModuleError};
use crate::types::{HandlerContext, SafetyLevel};

pub use custom::CustomCommandHandler;
pub use document::DocumentHandler;
pub use email::EmailHandler;
pub use entertainment::EntertainmentHandler;
pub use meeting::MeetingHandler;
pub use note::NoteHandler;
pub use recommendation::RecommendationHandler;
pub use task::TaskHandler;
pub use translate::TranslateHandler;
pub use weather_news::WeatherNewsHandler;
pub use web::WebHandler;

/// A handler for one module category.
///
/// `execute` returns the structured result. Recoverable domain outcomes
/// (nothing found, unknown command) are returned as `{error}` values;
/// `Err` is reserved for failures of the handler's collaborators.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    fn kind(&self) -> ModuleKind;

    fn safety_level(&self) -> SafetyLevel {
        SafetyLevel::Passive
    }

    async fn execute(&self, intent: &Intent, ctx: &HandlerContext) -> Result<Value, ModuleError>;

    /// One-line human description of what `execute` would do.
    fn describe(&self, intent: &Intent) -> String;
}

/// Maps each module kind to its handler.
pub struct ModuleRegistry {
    handlers: HashMap<ModuleKind, Arc<dyn ModuleHandler>>,
    timeout: Duration,
}

impl ModuleRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            timeout,
        }
    }

    /// Register a handler, replacing any previous handler of the same kind.
    pub fn register(&mut self, handler: Arc<dyn ModuleHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn get(&self, kind: ModuleKind) -> Option<Arc<dyn ModuleHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Registered kinds in routing precedence order.
    pub fn kinds(&self) -> Vec<ModuleKind> {
        ModuleKind::ALL
            .into_iter()
            .filter(|k| self.handlers.contains_key(k))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `kind`.
    ///
    /// Every failure except missing delegated credentials is folded into an
    /// `{error}` result.
    pub async fn dispatch(
        &self,
        kind: ModuleKind,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, AuthRequired> {
        let Some(handler) = self.get(kind) else {
            let err = ModuleError::Unregistered(kind);
            tracing::warn!(module = %kind, "No handler registered");
            return Ok(HandlerResult::error(err.to_string()));
        };

        tracing::debug!(
            module = %kind,
            safety = %handler.safety_level(),
            action = %handler.describe(intent),
            "Dispatching to handler"
        );

        match tokio::time::timeout(self.timeout, handler.execute(intent, ctx)).await {
            Ok(Ok(value)) => Ok(HandlerResult::new(value)),
            Ok(Err(ModuleError::AuthRequired(reason))) => {
                tracing::info!(module = %kind, %reason, "Handler requires authorization");
                Err(AuthRequired(reason))
            }
            Ok(Err(err)) => {
                tracing::warn!(module = %kind, error = %err, "Handler failed");
                Ok(HandlerResult::error(err.to_string()))
            }
            Err(_) => {
                let err = ModuleError::Timeout(self.timeout.as_secs());
                tracing::warn!(module = %kind, timeout_secs = self.timeout.as_secs(), "Handler timed out");
                Ok(HandlerResult::error(err.to_string()))
            }
        }
    }

    /// Registry with every built-in handler wired to its real collaborators.
    pub fn with_defaults(
        config: &AuraConfig,
        db: Arc<Database>,
        model: SharedModel,
    ) -> Result<Self, ModuleError> {
        let timeout_secs = config.services.timeout_secs;
        let http = http_client(timeout_secs)?;
        let mut registry = Self::new(Duration::from_secs(timeout_secs));

        let news = Arc::new(NewsApiClient::new(http.clone(), config.news.clone(), timeout_secs));

        registry.register(Arc::new(TaskHandler::new(
            TaskRepository::new(Arc::clone(&db)),
            Arc::clone(&model),
        )));
        registry.register(Arc::new(WebHandler::new(
            Arc::new(GoogleSearchClient::new(http.clone(), config.search.clone(), timeout_secs)),
            Arc::clone(&model),
        )));
        registry.register(Arc::new(NoteHandler::new(
            NoteRepository::new(Arc::clone(&db)),
            Arc::clone(&model),
        )));
        registry.register(Arc::new(TranslateHandler::new(Arc::new(ModelTranslator::new(
            Arc::clone(&model),
        )))));
        registry.register(Arc::new(EmailHandler::new(
            Arc::new(GmailClient::new(http.clone(), config.email.clone(), timeout_secs)),
            Arc::clone(&model),
            config.email.fetch_limit,
        )));
        registry.register(Arc::new(WeatherNewsHandler::new(
            Arc::new(RapidWeatherClient::new(http.clone(), config.weather.clone(), timeout_secs)),
            news.clone(),
            config.weather.default_location.clone(),
            config.news.default_category.clone(),
        )));

        let folders = document::resolve_folders(&config.documents.folders);
        let music_dir = folders
            .get("music")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        registry.register(Arc::new(DocumentHandler::new(folders, Arc::clone(&model))));

        registry.register(Arc::new(RecommendationHandler::new(
            PreferenceRepository::new(Arc::clone(&db)),
            TaskRepository::new(Arc::clone(&db)),
            news,
            Arc::clone(&model),
            config.recommendations.clone(),
        )));
        registry.register(Arc::new(EntertainmentHandler::new(
            Arc::new(SpotifyController::new(http.clone(), &config.media, timeout_secs)),
            Arc::new(YoutubeClient::new(http, &config.media, timeout_secs)),
            music_dir,
            config.media.volume_step,
        )));
        registry.register(Arc::new(MeetingHandler::new(
            MeetingRepository::new(Arc::clone(&db)),
            Arc::clone(&model),
            expand_home(&config.meetings.transcript_dir),
        )));
        registry.register(Arc::new(CustomCommandHandler::new(
            CustomCommandRepository::new(db),
            model,
            &config.custom,
        )));

        tracing::info!(handlers = registry.len(), timeout_secs, "Module registry ready");
        Ok(registry)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("kinds", &self.kinds())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Lowercased, trimmed command verb.
pub(crate) fn command_of(intent: &Intent) -> String {
    intent.command.trim().to_lowercase()
}

/// Integer field that may arrive as a number or a numeric string.
pub(crate) fn payload_i64(intent: &Intent, key: &str) -> Option<i64> {
    match intent.payload.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Accept only a bare file name: no separators, no parent references.
pub(crate) fn safe_file_name(name: &str) -> Result<&str, ModuleError> {
    let name = name.trim();
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(ModuleError::InvalidPayload(format!(
            "'{name}' is not a valid file name"
        )));
    }
    Ok(name)
}
