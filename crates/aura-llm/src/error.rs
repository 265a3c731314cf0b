use thiserror::Error;

use aura_core::error::AuraError;

/// Errors raised while talking to a language model.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Language model is not configured: {0}")]
    NotConfigured(String),

    #[error("Language model request failed: {0}")]
    Request(String),

    #[error("Language model timed out after {0}s")]
    Timeout(u64),

    #[error("Language model returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Language model returned no text")]
    EmptyResponse,

    #[error("Failed to decode language model response: {0}")]
    Decode(String),
}

impl From<LlmError> for AuraError {
    fn from(err: LlmError) -> Self {
        AuraError::Llm(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmError::Http {
            status: 429,
            message: "RESOURCE_EXHAUSTED: quota".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Language model returned HTTP 429: RESOURCE_EXHAUSTED: quota"
        );
        assert_eq!(LlmError::Timeout(30).to_string(), "Language model timed out after 30s");
    }

    #[test]
    fn test_into_aura_error() {
        let err: AuraError = LlmError::EmptyResponse.into();
        assert!(matches!(err, AuraError::Llm(_)));
    }
}
