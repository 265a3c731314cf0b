//! Integration tests for the Aura API.
//!
//! Each test builds its own in-memory state with a scripted language model
//! and drives the router with `oneshot`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use aura_api::create_router;
use aura_api::handlers::{CommandResponse, HealthResponse, HistoryResponse, SessionResponse};
use aura_api::state::AppState;
use aura_chat::{CommandOrchestrator, Router as CommandRouter, SessionManager};
use aura_core::config::AuraConfig;
use aura_core::types::{Intent, ModuleKind};
use aura_llm::ScriptedModel;
use aura_modules::{HandlerContext, ModuleError, ModuleHandler, ModuleRegistry};
use aura_storage::{Database, SessionStore};

// =============================================================================
// Helpers
// =============================================================================

/// Task handler double that answers with a canned value.
struct CannedTasks {
    reply: Value,
}

#[async_trait]
impl ModuleHandler for CannedTasks {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Task
    }

    async fn execute(&self, _intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        Ok(self.reply.clone())
    }

    fn describe(&self, _intent: &Intent) -> String {
        "canned tasks".to_string()
    }
}

/// Email handler double that demands a specific bearer token.
#[derive(Default)]
struct GuardedMail {
    seen: Mutex<Option<String>>,
}

#[async_trait]
impl ModuleHandler for GuardedMail {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Email
    }

    async fn execute(&self, _intent: &Intent, ctx: &HandlerContext) -> Result<Value, ModuleError> {
        *self.seen.lock().unwrap() = ctx.bearer_token.clone();
        match ctx.bearer_token.as_deref() {
            Some("good-token") => Ok(json!({"emails": []})),
            _ => Err(ModuleError::AuthRequired("Invalid access token.".to_string())),
        }
    }

    fn describe(&self, _intent: &Intent) -> String {
        "guarded mail".to_string()
    }
}

fn make_state(script: ScriptedModel, handlers: Vec<Arc<dyn ModuleHandler>>) -> AppState {
    make_state_with(script, handlers, AuraConfig::default())
}

fn make_state_with(
    script: ScriptedModel,
    handlers: Vec<Arc<dyn ModuleHandler>>,
    config: AuraConfig,
) -> AppState {
    let db = Arc::new(Database::in_memory().unwrap());
    let mut registry = ModuleRegistry::new(Duration::from_secs(5));
    for handler in handlers {
        registry.register(handler);
    }
    let orchestrator = CommandOrchestrator::new(
        Arc::new(script),
        CommandRouter::default(),
        Arc::new(registry),
        SessionManager::new(SessionStore::new(db)),
        config.chat.clone(),
    )
    .unwrap();
    AppState::new(config, Arc::new(orchestrator))
}

fn post_command(json: &str) -> Request<Body> {
    Request::post("/command")
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn post_command_with_token(json: &str, token: &str) -> Request<Body> {
    Request::post("/command")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(json.to_string()))
        .unwrap()
}

/// Read full response body bytes.
async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

const DELETE_INTENT: &str =
    r#"{"module": "task", "command": "delete", "payload": {"title": "Buy groceries"}}"#;
const FETCH_INTENT: &str = r#"{"module": "email", "command": "fetch", "payload": {}}"#;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_happy_path() {
    let app = create_router(make_state(ScriptedModel::new(), vec![]));
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.session_id, 1);
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// POST /command
// =============================================================================

#[tokio::test]
async fn test_command_narrated() {
    let state = make_state(
        ScriptedModel::new()
            .reply(DELETE_INTENT)
            .reply("The task 'Buy groceries' has been deleted successfully."),
        vec![Arc::new(CannedTasks {
            reply: json!({"status": "success", "message": "Task 'Buy groceries' deleted successfully."}),
        })],
    );
    let resp = create_router(state)
        .oneshot(post_command(r#"{"command": "Delete the task titled 'Buy groceries'."}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: CommandResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(body.response.contains("Buy groceries"));
    assert!(body.response.contains("deleted"));
    assert_eq!(body.module, Some(ModuleKind::Task));
}

#[tokio::test]
async fn test_command_conversational_fallback() {
    let state = make_state(
        ScriptedModel::new().reply(r#"{"module": "", "message": "I'm great, thanks!"}"#),
        vec![],
    );
    let resp = create_router(state)
        .oneshot(post_command(r#"{"command": "Hello, how are you today?"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["response"], "I'm great, thanks!");
    assert!(body.get("module").is_none());
}

#[tokio::test]
async fn test_command_missing_field() {
    let app = create_router(make_state(ScriptedModel::new(), vec![]));
    let resp = app.oneshot(post_command(r#"{"text": "hi"}"#)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Command is required.");
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_command_malformed_json() {
    let app = create_router(make_state(ScriptedModel::new(), vec![]));
    let resp = app.oneshot(post_command("{not json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_command_blank() {
    let app = create_router(make_state(ScriptedModel::new(), vec![]));
    let resp = app.oneshot(post_command(r#"{"command": "   "}"#)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Command is required.");
}

#[tokio::test]
async fn test_command_unparseable_intent() {
    let state = make_state(ScriptedModel::new().reply("Sorry, what?"), vec![]);
    let resp = create_router(state)
        .oneshot(post_command(r#"{"command": "blorp"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["kind"], "parse_error");
    assert_eq!(body["details"]["raw"], "Sorry, what?");
}

#[tokio::test]
async fn test_command_handler_error_is_404() {
    let state = make_state(
        ScriptedModel::new().reply(DELETE_INTENT),
        vec![Arc::new(CannedTasks {
            reply: json!({"error": "Task 'Buy groceries' not found."}),
        })],
    );
    let resp = create_router(state)
        .oneshot(post_command(r#"{"command": "Delete the task titled 'Buy groceries'."}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Task 'Buy groceries' not found.");
    assert_eq!(body["kind"], "handler_error");
}

#[tokio::test]
async fn test_command_synthesis_failure_is_500_with_result() {
    let state = make_state(
        ScriptedModel::new().reply(DELETE_INTENT),
        vec![Arc::new(CannedTasks {
            reply: json!({"tasks": [{"title": "Buy groceries"}]}),
        })],
    );
    let resp = create_router(state)
        .oneshot(post_command(r#"{"command": "list tasks"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["kind"], "synthesis_error");
    assert_eq!(body["details"]["tasks"][0]["title"], "Buy groceries");
}

#[tokio::test]
async fn test_command_status_only_short_circuit() {
    let state = make_state(
        ScriptedModel::new().reply(DELETE_INTENT),
        vec![Arc::new(CannedTasks {
            reply: json!({"status": "success"}),
        })],
    );
    let resp = create_router(state)
        .oneshot(post_command(r#"{"command": "delete it"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["response"], r#"{"status":"success"}"#);
}

// =============================================================================
// Delegated authorization
// =============================================================================

#[tokio::test]
async fn test_email_without_token_is_401() {
    let mail = Arc::new(GuardedMail::default());
    let state = make_state(ScriptedModel::new().reply(FETCH_INTENT), vec![mail.clone()]);
    let resp = create_router(state)
        .oneshot(post_command(r#"{"command": "Fetch emails from my inbox."}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["kind"], "auth_required");
    assert_eq!(body["error"], "Invalid access token.");
    assert!(mail.seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_email_token_is_forwarded() {
    let mail = Arc::new(GuardedMail::default());
    let state = make_state(
        ScriptedModel::new()
            .reply(FETCH_INTENT)
            .reply("Your inbox is empty."),
        vec![mail.clone()],
    );
    let resp = create_router(state)
        .oneshot(post_command_with_token(
            r#"{"command": "Fetch emails from my inbox."}"#,
            "good-token",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["response"], "Your inbox is empty.");
    assert_eq!(mail.seen.lock().unwrap().as_deref(), Some("good-token"));
}

// =============================================================================
// Sessions and history
// =============================================================================

#[tokio::test]
async fn test_history_lists_turns_in_order() {
    let state = make_state(
        ScriptedModel::new()
            .reply(r#"{"module": "", "message": "Hi!"}"#)
            .reply(r#"{"module": "", "message": "Bye!"}"#),
        vec![],
    );
    let app = create_router(state);
    for command in ["hello", "goodbye"] {
        let resp = app
            .clone()
            .oneshot(post_command(&format!(r#"{{"command": "{command}"}}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(Request::get("/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let commands: Vec<&str> = history.turns.iter().map(|t| t.raw_command.as_str()).collect();
    assert_eq!(commands, vec!["hello", "goodbye"]);
    assert_eq!(history.turns[0].response_text, r#"{"module": "", "message": "Hi!"}"#);
}

#[tokio::test]
async fn test_new_session_increments_id() {
    let app = create_router(make_state(ScriptedModel::new(), vec![]));
    let resp = app
        .clone()
        .oneshot(Request::post("/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session: SessionResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(session.session_id, 2);

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.session_id, 2);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_excess() {
    let mut config = AuraConfig::default();
    config.general.rate_limit_per_sec = 0;
    let app = create_router(make_state_with(ScriptedModel::new(), vec![], config));

    let resp = app
        .clone()
        .oneshot(post_command(r#"{"command": "hi"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(resp).await["kind"], "too_many_requests");

    // health is not rate limited
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_body_limit() {
    let app = create_router(make_state(ScriptedModel::new(), vec![]));
    let huge = format!(r#"{{"command": "{}"}}"#, "a".repeat(2 * 1024 * 1024));
    let resp = app.oneshot(post_command(&huge)).await.unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_router(make_state(ScriptedModel::new(), vec![]));
    let resp = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
