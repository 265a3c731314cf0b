//! Command orchestrator: the single entry point for HTTP and the REPL.
//!
//! One request runs parse, route, handle and synthesize in a single pass.
//! Requests against the same session are serialized on that session's
//! async mutex; the turn is appended to the log right after a successful
//! parse.

use std::fmt;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use aura_core::config::ChatConfig;
use aura_core::types::{ModuleKind, ResultKind, Turn};
use aura_llm::{clean_reply, SharedModel};
use aura_modules::{HandlerContext, ModuleRegistry};

use crate::context::{SessionContext, SessionManager};
use crate::error::ChatError;
use crate::parser::IntentParser;
use crate::response::ResponseSynthesizer;
use crate::router::{Route, Router};

// =============================================================================
// Request state machine
// =============================================================================

/// Lifecycle of a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Parsed,
    Routed,
    Handled,
    Synthesized,
    Returned,
    ParseFailed,
    HandlerFailed,
}

impl RequestState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Received, Parsed)
                | (Received, ParseFailed)
                | (Parsed, Routed)
                | (Routed, Handled)
                | (Routed, HandlerFailed)
                // fallback replies skip the handler
                | (Routed, Returned)
                | (Handled, Synthesized)
                | (Synthesized, Returned)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Returned | RequestState::ParseFailed | RequestState::HandlerFailed
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Received => "RECEIVED",
            RequestState::Parsed => "PARSED",
            RequestState::Routed => "ROUTED",
            RequestState::Handled => "HANDLED",
            RequestState::Synthesized => "SYNTHESIZED",
            RequestState::Returned => "RETURNED",
            RequestState::ParseFailed => "PARSE_FAILED",
            RequestState::HandlerFailed => "HANDLER_FAILED",
        };
        write!(f, "{name}")
    }
}

/// Ordered record of the states one request passed through.
#[derive(Debug, Clone)]
pub struct RequestTrace {
    states: Vec<RequestState>,
}

impl Default for RequestTrace {
    fn default() -> Self {
        Self {
            states: vec![RequestState::Received],
        }
    }
}

impl RequestTrace {
    pub fn current(&self) -> RequestState {
        self.states
            .last()
            .copied()
            .unwrap_or(RequestState::Received)
    }

    pub fn states(&self) -> &[RequestState] {
        &self.states
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: RequestState) {
        let current = self.current();
        if !current.can_advance_to(next) {
            tracing::warn!(from = %current, to = %next, "Illegal request state transition");
            return;
        }
        tracing::debug!(from = %current, to = %next, "Request state");
        self.states.push(next);
    }
}

// =============================================================================
// CommandOrchestrator
// =============================================================================

/// Successful outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    pub request_id: Uuid,
    pub session_id: i64,
    /// Handler that served the command, `None` for fallback replies.
    pub module: Option<ModuleKind>,
    pub response: String,
    pub states: Vec<RequestState>,
}

/// Wires parser, router, registry and synthesizer around the active session.
pub struct CommandOrchestrator {
    parser: IntentParser,
    router: Router,
    registry: Arc<ModuleRegistry>,
    synthesizer: ResponseSynthesizer,
    sessions: SessionManager,
    active: RwLock<Arc<Mutex<SessionContext>>>,
    config: ChatConfig,
}

impl CommandOrchestrator {
    /// Build the orchestrator and bootstrap its first session.
    pub fn new(
        model: SharedModel,
        router: Router,
        registry: Arc<ModuleRegistry>,
        sessions: SessionManager,
        config: ChatConfig,
    ) -> Result<Self, ChatError> {
        let context = sessions.bootstrap()?;
        Ok(Self {
            parser: IntentParser::new(model.clone()),
            router,
            registry,
            synthesizer: ResponseSynthesizer::new(model),
            sessions,
            active: RwLock::new(Arc::new(Mutex::new(context))),
            config,
        })
    }

    fn active_session(&self) -> Result<Arc<Mutex<SessionContext>>, ChatError> {
        self.active
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|e| ChatError::Storage(format!("session lock poisoned: {e}")))
    }

    /// Id of the session new commands are recorded under.
    pub async fn session_id(&self) -> Result<i64, ChatError> {
        let session = self.active_session()?;
        let id = session.lock().await.session_id;
        Ok(id)
    }

    /// Start a fresh session seeded with the latest history and make it active.
    ///
    /// The write guard is held across the bootstrap, so the session made
    /// active is always the one with the highest id handed out.
    pub fn start_session(&self) -> Result<i64, ChatError> {
        let mut active = self
            .active
            .write()
            .map_err(|e| ChatError::Storage(format!("session lock poisoned: {e}")))?;
        let context = self.sessions.bootstrap()?;
        let id = context.session_id;
        *active = Arc::new(Mutex::new(context));
        Ok(id)
    }

    /// Turns recorded in the active session.
    pub async fn history(&self) -> Result<Vec<Turn>, ChatError> {
        let id = self.session_id().await?;
        self.sessions.turns(id)
    }

    /// Run one command through the full pipeline.
    ///
    /// `bearer_token` is forwarded to handlers that act on the user's behalf.
    pub async fn handle_command(
        &self,
        command: &str,
        bearer_token: Option<String>,
    ) -> Result<CommandReply, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        let command = command.trim();
        if command.is_empty() {
            return Err(ChatError::EmptyCommand);
        }
        if command.chars().count() > self.config.max_command_length {
            return Err(ChatError::CommandTooLong(self.config.max_command_length));
        }

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("command", %request_id);
        self.run(request_id, command, bearer_token)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        request_id: Uuid,
        command: &str,
        bearer_token: Option<String>,
    ) -> Result<CommandReply, ChatError> {
        let handle = self.active_session()?;
        let mut session = handle.lock().await;
        let session_id = session.session_id;
        let mut trace = RequestTrace::default();
        tracing::info!(session_id, "Command received");

        let parsed = match self.parser.parse(&session.history, command).await {
            Ok(parsed) => parsed,
            Err(e) => {
                trace.advance(RequestState::ParseFailed);
                tracing::warn!(session_id, error = %e, "Intent parse failed");
                return Err(e);
            }
        };
        trace.advance(RequestState::Parsed);
        self.sessions.record(&mut session, command, &parsed.raw)?;

        let route = self.router.route(&parsed.intent);
        trace.advance(RequestState::Routed);

        let kind = match route {
            Route::Module(kind) => kind,
            Route::Fallback => {
                let response = parsed
                    .intent
                    .message
                    .clone()
                    .unwrap_or_else(|| clean_reply(&parsed.raw));
                trace.advance(RequestState::Returned);
                tracing::info!(session_id, "Unrouted reply");
                return Ok(CommandReply {
                    request_id,
                    session_id,
                    module: None,
                    response,
                    states: trace.states().to_vec(),
                });
            }
        };
        tracing::info!(session_id, module = %kind, "Routed command");

        let ctx = HandlerContext::new(command).with_bearer_token(bearer_token);
        let result = match self.registry.dispatch(kind, &parsed.intent, &ctx).await {
            Ok(result) => result,
            Err(auth) => {
                trace.advance(RequestState::HandlerFailed);
                return Err(auth.into());
            }
        };
        if result.kind() == ResultKind::Error {
            trace.advance(RequestState::HandlerFailed);
            let message = result.error_message().unwrap_or_default();
            tracing::info!(session_id, module = %kind, error = %message, "Handler returned error");
            return Err(ChatError::Handler(message));
        }
        trace.advance(RequestState::Handled);

        let response = self
            .synthesizer
            .synthesize(Some(kind), command, &result)
            .await?;
        trace.advance(RequestState::Synthesized);
        trace.advance(RequestState::Returned);

        Ok(CommandReply {
            request_id,
            session_id,
            module: Some(kind),
            response,
            states: trace.states().to_vec(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use aura_core::types::{HistoryEntry, Intent};
    use aura_llm::ScriptedModel;
    use aura_modules::{ModuleError, ModuleHandler};
    use aura_storage::{Database, SessionStore};
    use serde_json::{json, Value};

    use RequestState::*;

    /// Handler that answers from a fixed value and remembers the bearer token.
    struct FixedHandler {
        kind: ModuleKind,
        reply: Result<Value, String>,
        seen_token: std::sync::Mutex<Option<String>>,
    }

    impl FixedHandler {
        fn ok(kind: ModuleKind, value: Value) -> Self {
            Self {
                kind,
                reply: Ok(value),
                seen_token: std::sync::Mutex::new(None),
            }
        }

        fn auth(kind: ModuleKind) -> Self {
            Self {
                kind,
                reply: Err("Invalid access token.".to_string()),
                seen_token: std::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ModuleHandler for FixedHandler {
        fn kind(&self) -> ModuleKind {
            self.kind
        }

        async fn execute(&self, _intent: &Intent, ctx: &HandlerContext) -> Result<Value, ModuleError> {
            *self.seen_token.lock().unwrap() = ctx.bearer_token.clone();
            match &self.reply {
                Ok(value) => Ok(value.clone()),
                Err(reason) => Err(ModuleError::AuthRequired(reason.clone())),
            }
        }

        fn describe(&self, _intent: &Intent) -> String {
            "fixed".to_string()
        }
    }

    struct Fixture {
        orchestrator: CommandOrchestrator,
        model: Arc<ScriptedModel>,
        store: SessionStore,
    }

    fn fixture(script: ScriptedModel, handlers: Vec<Arc<dyn ModuleHandler>>) -> Fixture {
        let db = Arc::new(Database::in_memory().unwrap());
        let store = SessionStore::new(Arc::clone(&db));
        let mut registry = ModuleRegistry::new(Duration::from_secs(5));
        for handler in handlers {
            registry.register(handler);
        }
        let model = Arc::new(script);
        let orchestrator = CommandOrchestrator::new(
            model.clone(),
            Router::default(),
            Arc::new(registry),
            SessionManager::new(store.clone()),
            ChatConfig::default(),
        )
        .unwrap();
        Fixture {
            orchestrator,
            model,
            store,
        }
    }

    const DELETE_INTENT: &str =
        r#"{"module": "task", "command": "delete", "payload": {"title": "Buy groceries"}}"#;

    // ---- state machine ----

    #[test]
    fn test_state_transitions() {
        assert!(Received.can_advance_to(Parsed));
        assert!(Received.can_advance_to(ParseFailed));
        assert!(Routed.can_advance_to(HandlerFailed));
        assert!(Routed.can_advance_to(Returned));
        assert!(!Received.can_advance_to(Routed));
        assert!(!Parsed.can_advance_to(HandlerFailed));
        assert!(!Returned.can_advance_to(Received));
        assert!(ParseFailed.is_terminal());
        assert!(!Handled.is_terminal());
        assert_eq!(ParseFailed.to_string(), "PARSE_FAILED");
    }

    #[test]
    fn test_trace_ignores_illegal_transition() {
        let mut trace = RequestTrace::default();
        trace.advance(Handled);
        assert_eq!(trace.states(), &[Received]);
        trace.advance(Parsed);
        assert_eq!(trace.current(), Parsed);
    }

    // ---- full cycle ----

    #[tokio::test]
    async fn test_handled_and_narrated() {
        let handler = FixedHandler::ok(
            ModuleKind::Task,
            json!({"status": "success", "message": "Task 'Buy groceries' deleted successfully."}),
        );
        let f = fixture(
            ScriptedModel::new()
                .reply(DELETE_INTENT)
                .reply("The task 'Buy groceries' has been deleted."),
            vec![Arc::new(handler)],
        );

        let reply = f
            .orchestrator
            .handle_command("Delete the task titled 'Buy groceries'.", None)
            .await
            .unwrap();
        assert_eq!(reply.module, Some(ModuleKind::Task));
        assert_eq!(reply.response, "The task 'Buy groceries' has been deleted.");
        assert_eq!(
            reply.states,
            vec![Received, Parsed, Routed, Handled, Synthesized, Returned]
        );
        assert_eq!(f.model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_turn_records_raw_parser_reply() {
        let f = fixture(
            ScriptedModel::new().reply(r#"{"module": "", "message": "Hi there!"}"#),
            vec![],
        );
        let reply = f.orchestrator.handle_command("Hello", None).await.unwrap();
        assert_eq!(reply.response, "Hi there!");
        assert_eq!(reply.module, None);
        assert_eq!(reply.states, vec![Received, Parsed, Routed, Returned]);

        let turns = f.orchestrator.history().await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].raw_command, "Hello");
        assert_eq!(turns[0].response_text, r#"{"module": "", "message": "Hi there!"}"#);
    }

    #[tokio::test]
    async fn test_history_is_sent_on_next_parse() {
        let f = fixture(
            ScriptedModel::new()
                .reply(r#"{"module": "", "message": "Hi!"}"#)
                .reply(r#"{"module": "", "message": "Fine."}"#),
            vec![],
        );
        f.orchestrator.handle_command("Hello", None).await.unwrap();
        f.orchestrator.handle_command("How are you?", None).await.unwrap();

        let second = &f.model.calls()[1];
        assert_eq!(
            second.history,
            vec![
                HistoryEntry::user("Hello"),
                HistoryEntry::model(r#"{"module": "", "message": "Hi!"}"#),
            ]
        );
    }

    #[tokio::test]
    async fn test_parse_failure_records_nothing() {
        let f = fixture(ScriptedModel::new().reply("I am not JSON"), vec![]);
        let err = f.orchestrator.handle_command("gibberish", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Parse { ref raw, .. } if raw == "I am not JSON"));
        assert!(f.orchestrator.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_result_is_handler_failure() {
        let handler = FixedHandler::ok(ModuleKind::Task, json!({"error": "Task not found."}));
        let f = fixture(ScriptedModel::new().reply(DELETE_INTENT), vec![Arc::new(handler)]);

        let err = f.orchestrator.handle_command("delete it", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Handler(ref m) if m == "Task not found."));
        // parse only; the error never reaches synthesis
        assert_eq!(f.model.call_count(), 1);
        // the parse itself was still logged
        assert_eq!(f.orchestrator.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_module_is_handler_failure() {
        let f = fixture(ScriptedModel::new().reply(DELETE_INTENT), vec![]);
        let err = f.orchestrator.handle_command("delete it", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Handler(_)));
    }

    #[tokio::test]
    async fn test_auth_required_forwarded() {
        let handler = Arc::new(FixedHandler::auth(ModuleKind::Email));
        let f = fixture(
            ScriptedModel::new().reply(r#"{"module": "email", "command": "fetch", "payload": {}}"#),
            vec![handler.clone()],
        );
        let err = f
            .orchestrator
            .handle_command("Fetch emails from my inbox.", Some("tok-123".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::AuthRequired(ref m) if m == "Invalid access token."));
        assert_eq!(handler.seen_token.lock().unwrap().as_deref(), Some("tok-123"));
    }

    #[tokio::test]
    async fn test_status_only_result_skips_model() {
        let handler = FixedHandler::ok(ModuleKind::Entertainment, json!({"status": "success"}));
        let f = fixture(
            ScriptedModel::new().reply(r#"{"module": "entertainment", "command": "pause"}"#),
            vec![Arc::new(handler)],
        );
        let reply = f.orchestrator.handle_command("pause the music", None).await.unwrap();
        assert_eq!(reply.response, r#"{"status":"success"}"#);
        assert_eq!(f.model.call_count(), 1);
    }

    // ---- validation & sessions ----

    #[tokio::test]
    async fn test_rejects_empty_and_long_commands() {
        let f = fixture(ScriptedModel::new(), vec![]);
        assert!(matches!(
            f.orchestrator.handle_command("   ", None).await,
            Err(ChatError::EmptyCommand)
        ));
        let long = "a".repeat(ChatConfig::default().max_command_length + 1);
        assert!(matches!(
            f.orchestrator.handle_command(&long, None).await,
            Err(ChatError::CommandTooLong(_))
        ));
        assert_eq!(f.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled() {
        let db = Arc::new(Database::in_memory().unwrap());
        let orchestrator = CommandOrchestrator::new(
            Arc::new(ScriptedModel::new()),
            Router::default(),
            Arc::new(ModuleRegistry::new(Duration::from_secs(1))),
            SessionManager::new(SessionStore::new(db)),
            ChatConfig {
                enabled: false,
                ..ChatConfig::default()
            },
        )
        .unwrap();
        assert!(matches!(
            orchestrator.handle_command("hi", None).await,
            Err(ChatError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_start_session_allocates_next_id() {
        let f = fixture(ScriptedModel::always(r#"{"module": "", "message": "ok"}"#), vec![]);
        assert_eq!(f.orchestrator.session_id().await.unwrap(), 1);
        f.orchestrator.handle_command("first", None).await.unwrap();

        assert_eq!(f.orchestrator.start_session().unwrap(), 2);
        assert_eq!(f.orchestrator.session_id().await.unwrap(), 2);
        assert!(f.orchestrator.history().await.unwrap().is_empty());
        assert_eq!(f.store.latest_session_id().unwrap(), Some(1));

        // the new session's first parse sees the previous conversation
        f.orchestrator.handle_command("second", None).await.unwrap();
        let call = f.model.calls().last().cloned().unwrap();
        assert_eq!(call.history[0], HistoryEntry::user("first"));
    }

    #[tokio::test]
    async fn test_concurrent_commands_are_serialized() {
        let f = Arc::new(fixture(
            ScriptedModel::always(r#"{"module": "", "message": "ok"}"#),
            vec![],
        ));
        let mut tasks = Vec::new();
        for i in 0..8 {
            let f = Arc::clone(&f);
            tasks.push(tokio::spawn(async move {
                f.orchestrator
                    .handle_command(&format!("command {i}"), None)
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let turns = f.orchestrator.history().await.unwrap();
        let seqs: Vec<i64> = turns.iter().map(|t| t.seq).collect();
        assert_eq!(seqs, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrent_session_starts_keep_latest_active() {
        let f = fixture(ScriptedModel::new(), vec![]);
        let ids: Vec<i64> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| f.orchestrator.start_session().unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (2..=9).collect::<Vec<_>>());
        assert_eq!(f.orchestrator.session_id().await.unwrap(), 9);
        assert_eq!(f.store.counter_value(aura_storage::SESSION_COUNTER).unwrap(), 9);
    }
}
