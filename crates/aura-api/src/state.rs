//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use aura_chat::CommandOrchestrator;
use aura_core::config::AuraConfig;

/// Shared application state, passed to handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuraConfig>,
    /// Command pipeline shared with the REPL.
    pub orchestrator: Arc<CommandOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AuraConfig, orchestrator: Arc<CommandOrchestrator>) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
            start_time: Instant::now(),
        }
    }
}
