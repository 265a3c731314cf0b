//! Route handler functions for all API endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aura_core::types::{ModuleKind, Turn};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Body of `POST /command`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleKind>,
    pub session_id: i64,
    pub request_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub session_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: i64,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: i64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Token from `Authorization: Bearer <token>`, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// POST /command - run one command through the pipeline.
pub async fn command(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected command body");
        ApiError::BadRequest("Command is required.".to_string())
    })?;

    let reply = state
        .orchestrator
        .handle_command(&request.command, bearer_token(&headers))
        .await?;

    Ok(Json(CommandResponse {
        response: reply.response,
        module: reply.module,
        session_id: reply.session_id,
        request_id: reply.request_id,
    }))
}

/// GET /health - liveness and the active session.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let session_id = state.orchestrator.session_id().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        session_id,
    }))
}

/// GET /history - turns of the active session, oldest first.
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ApiError> {
    let session_id = state.orchestrator.session_id().await?;
    let turns = state.orchestrator.history().await?;
    Ok(Json(HistoryResponse { session_id, turns }))
}

/// POST /session - bootstrap a new session seeded with the latest history.
pub async fn new_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = state.orchestrator.start_session()?;
    Ok(Json(SessionResponse { session_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer ya29.abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("ya29.abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
