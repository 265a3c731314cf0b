use serde::{Deserialize, Serialize};

/// Whether a handler only reads/queries or causes side effects outside the
/// assistant's own store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Passive,
    Active,
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyLevel::Passive => write!(f, "passive"),
            SafetyLevel::Active => write!(f, "active"),
        }
    }
}

/// Per-request data handed to every handler invocation.
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    /// Delegated OAuth access token from `Authorization: Bearer`.
    pub bearer_token: Option<String>,
    /// The raw user command, for handlers that re-read it.
    pub raw_command: String,
}

impl HandlerContext {
    pub fn new(raw_command: impl Into<String>) -> Self {
        Self {
            bearer_token: None,
            raw_command: raw_command.into(),
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_level_serde() {
        assert_eq!(serde_json::to_string(&SafetyLevel::Passive).unwrap(), "\"passive\"");
        assert_eq!(SafetyLevel::Active.to_string(), "active");
    }

    #[test]
    fn test_context_drops_blank_token() {
        let ctx = HandlerContext::new("fetch my email").with_bearer_token(Some("  ".to_string()));
        assert!(ctx.bearer_token.is_none());

        let ctx = HandlerContext::new("x").with_bearer_token(Some("ya29.token".to_string()));
        assert_eq!(ctx.bearer_token.as_deref(), Some("ya29.token"));
    }
}
