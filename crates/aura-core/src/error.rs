use thiserror::Error;

/// Top-level error type for the Aura assistant.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for AuraError` (or the reverse) so that `?` works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AuraError {
    fn from(err: toml::de::Error) -> Self {
        AuraError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AuraError {
    fn from(err: toml::ser::Error) -> Self {
        AuraError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AuraError {
    fn from(err: serde_json::Error) -> Self {
        AuraError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Aura operations.
pub type Result<T> = std::result::Result<T, AuraError>;
