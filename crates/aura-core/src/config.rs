use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AuraError, Result};
use crate::types::{default_route_table, RouteRule};

/// Top-level configuration for the Aura assistant.
///
/// Loaded from `~/.aura/config.toml` by default. Each section corresponds
/// to one component or one family of external services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuraConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub meetings: MeetingsConfig,
    #[serde(default)]
    pub recommendations: RecommendationsConfig,
    #[serde(default)]
    pub custom: CustomConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl AuraConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AuraConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AuraError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay credentials from `AURA_*` environment variables.
    ///
    /// Only non-empty variables replace the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let slots: [(&str, &mut String); 8] = [
            ("AURA_GEMINI_API_KEY", &mut self.llm.api_key),
            ("AURA_GOOGLE_API_KEY", &mut self.search.api_key),
            ("AURA_GOOGLE_CSE_ID", &mut self.search.engine_id),
            ("AURA_WEATHER_API_KEY", &mut self.weather.api_key),
            ("AURA_WEATHER_API_HOST", &mut self.weather.api_host),
            ("AURA_NEWS_API_KEY", &mut self.news.api_key),
            ("AURA_SPOTIFY_TOKEN", &mut self.media.spotify_token),
            ("AURA_YOUTUBE_API_KEY", &mut self.media.youtube_api_key),
        ];
        for (name, slot) in slots {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port for the command endpoint.
    pub port: u16,
    /// Requests per second accepted on the command routes.
    pub rate_limit_per_sec: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.aura/data".to_string(),
            log_level: "info".to_string(),
            port: 5000,
            rate_limit_per_sec: 20,
        }
    }
}

/// Language model settings (Gemini REST API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            timeout_secs: 30,
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

/// Command pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub enabled: bool,
    /// Maximum accepted command length in characters.
    pub max_command_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_command_length: 2000,
        }
    }
}

/// Ordered keyword dispatch table. The first matching rule wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub rules: Vec<RouteRule>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            rules: default_route_table(),
        }
    }
}

/// Settings shared by every outbound service call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Upper bound for a single handler invocation, in seconds.
    pub timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self { timeout_secs: 20 }
    }
}

/// Google Custom Search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: String,
    pub engine_id: String,
    pub url: String,
    pub num_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            engine_id: String::new(),
            url: "https://www.googleapis.com/customsearch/v1".to_string(),
            num_results: 5,
        }
    }
}

/// RapidAPI weather endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub api_host: String,
    pub url: String,
    pub default_location: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_host: "weatherapi-com.p.rapidapi.com".to_string(),
            url: "https://weatherapi-com.p.rapidapi.com/current.json".to_string(),
            default_location: "Zurich".to_string(),
        }
    }
}

/// NewsAPI top headlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_key: String,
    pub url: String,
    pub country: String,
    pub default_category: String,
    pub page_size: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: "https://newsapi.org/v2/top-headlines".to_string(),
            country: "us".to_string(),
            default_category: "general".to_string(),
            page_size: 5,
        }
    }
}

/// Gmail REST endpoints. The access token arrives per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub api_url: String,
    pub token_info_url: String,
    pub fetch_limit: u32,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: "https://gmail.googleapis.com/gmail/v1/users/me".to_string(),
            token_info_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            fetch_limit: 10,
        }
    }
}

/// Spotify and YouTube playback control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub spotify_token: String,
    pub spotify_api_url: String,
    pub youtube_api_key: String,
    pub youtube_api_url: String,
    /// Volume change applied by "volume up" / "volume down", in percent.
    pub volume_step: u8,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            spotify_token: String::new(),
            spotify_api_url: "https://api.spotify.com/v1".to_string(),
            youtube_api_key: String::new(),
            youtube_api_url: "https://www.googleapis.com/youtube/v3".to_string(),
            volume_step: 10,
        }
    }
}

/// Named base folders for document operations.
///
/// Entries override the platform folders (documents, downloads, desktop,
/// pictures, videos, music).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub folders: BTreeMap<String, String>,
}

/// Meeting transcript storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingsConfig {
    /// Directory searched for transcript files by name.
    pub transcript_dir: String,
}

impl Default for MeetingsConfig {
    fn default() -> Self {
        Self {
            transcript_dir: "~/.aura/meetings".to_string(),
        }
    }
}

/// Personalized recommendation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationsConfig {
    pub user_id: String,
    /// Categories picked from when no news preference is stored.
    pub interest_categories: Vec<String>,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            user_id: "default".to_string(),
            interest_categories: ["technology", "health", "entertainment", "business", "sports"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// User-defined shell commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomConfig {
    /// Stored commands only run when this is enabled.
    pub allow_execution: bool,
    pub shell: String,
}

impl Default for CustomConfig {
    fn default() -> Self {
        Self {
            allow_execution: false,
            shell: "sh".to_string(),
        }
    }
}

/// Background deadline notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub lookahead_minutes: i64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            lookahead_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AuraConfig::default();
        assert_eq!(config.general.data_dir, "~/.aura/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.port, 5000);
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.top_k, 40);
        assert_eq!(config.chat.max_command_length, 2000);
        assert_eq!(config.weather.default_location, "Zurich");
        assert_eq!(config.search.num_results, 5);
        assert_eq!(config.email.fetch_limit, 10);
        assert!(!config.custom.allow_execution);
        assert_eq!(config.router.rules.len(), 11);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/srv/aura"
log_level = "debug"
port = 8080

[llm]
api_key = "k"
model = "gemini-2.0-flash"
timeout_secs = 5

[weather]
default_location = "Paris"
"#;
        let file = create_temp_config(content);
        let config = AuraConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/srv/aura");
        assert_eq!(config.general.port, 8080);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.timeout_secs, 5);
        // Unspecified fields inside a section fall back to defaults.
        assert_eq!(config.llm.top_p, 0.95);
        assert_eq!(config.weather.default_location, "Paris");
        assert_eq!(config.weather.api_host, "weatherapi-com.p.rapidapi.com");
    }

    #[test]
    fn test_load_custom_route_table() {
        let content = r#"
[[router.rules]]
module = "email"
keywords = ["mail"]

[[router.rules]]
module = "task"
keywords = ["task"]
"#;
        let file = create_temp_config(content);
        let config = AuraConfig::load(file.path()).unwrap();
        assert_eq!(config.router.rules.len(), 2);
        assert_eq!(config.router.rules[0].module, ModuleKind::Email);
        assert_eq!(config.router.rules[1].keywords, vec!["task".to_string()]);
    }

    #[test]
    fn test_load_document_folders() {
        let content = r#"
[documents.folders]
documents = "/data/docs"
projects = "/data/projects"
"#;
        let file = create_temp_config(content);
        let config = AuraConfig::load(file.path()).unwrap();
        assert_eq!(config.documents.folders.get("projects").unwrap(), "/data/projects");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AuraConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.aura/data");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("general = [[[");
        let err = AuraConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, AuraError::Config(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AuraConfig::default();
        config.general.port = 9001;
        config.save(&path).unwrap();

        let reloaded = AuraConfig::load(&path).unwrap();
        assert_eq!(reloaded.general.port, 9001);
        assert_eq!(reloaded.router.rules, config.router.rules);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = AuraConfig::load(file.path()).unwrap();
        assert_eq!(config.news.country, "us");
        assert_eq!(config.notifications.lookahead_minutes, 60);
        assert_eq!(config.recommendations.interest_categories.len(), 5);
    }

    #[test]
    fn test_env_overrides_replace_non_empty_values() {
        let mut config = AuraConfig::default();
        config.search.api_key = "from-file".to_string();
        config.apply_overrides(|name| match name {
            "AURA_GEMINI_API_KEY" => Some("gem-key".to_string()),
            "AURA_GOOGLE_API_KEY" => Some("  ".to_string()),
            "AURA_NEWS_API_KEY" => Some("news-key".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.api_key, "gem-key");
        assert_eq!(config.search.api_key, "from-file");
        assert_eq!(config.news.api_key, "news-key");
        assert!(config.media.spotify_token.is_empty());
    }
}
