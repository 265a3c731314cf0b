//! Keyword router.
//!
//! An ordered table of [`RouteRule`]s is evaluated top to bottom; the first
//! rule with a keyword contained in the intent wins. The module string is
//! matched first and the command string only when the module matches
//! nothing, so `recommendation/tasks` stays with recommendations.

use aura_core::types::{default_route_table, Intent, ModuleKind, RouteRule};

/// Outcome of routing one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Module(ModuleKind),
    /// No rule matched. The parser's reply is returned unrouted.
    Fallback,
}

/// Ordered keyword dispatch table.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Vec<RouteRule>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(default_route_table())
    }
}

impl Router {
    /// Build a router from rules in precedence order. Keywords are
    /// lowercased and blank ones dropped.
    pub fn new(rules: Vec<RouteRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| RouteRule {
                module: rule.module,
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Select the handler for an intent.
    pub fn route(&self, intent: &Intent) -> Route {
        if intent.is_conversational() {
            return Route::Fallback;
        }
        let module = intent.module.to_lowercase();
        let command = intent.command.to_lowercase();
        match self.match_text(&module).or_else(|| self.match_text(&command)) {
            Some(kind) => Route::Module(kind),
            None => Route::Fallback,
        }
    }

    /// First module whose keywords appear in `text`.
    pub fn match_text(&self, text: &str) -> Option<ModuleKind> {
        if text.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|rule| rule.module)
    }
}
