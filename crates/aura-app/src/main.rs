//! Aura application binary - composition root.
//!
//! Ties the Aura crates into a single executable:
//! 1. Load configuration from TOML plus `AURA_*` overrides
//! 2. Open SQLite storage and the Gemini client
//! 3. Build the module registry, router and command orchestrator
//! 4. Start the deadline notifier
//! 5. Serve `POST /command` over HTTP, or run the stdin REPL

mod cli;

use std::sync::Arc;

use clap::Parser;
use rand::seq::IndexedRandom;
use tracing_subscriber::EnvFilter;

use aura_api::routes;
use aura_api::state::AppState;
use aura_chat::{is_exit, CommandOrchestrator, InputSource, Router, SessionManager, StdinSource};
use aura_core::config::AuraConfig;
use aura_llm::{GeminiClient, SharedModel};
use aura_modules::{DeadlineNotifier, ModuleRegistry};
use aura_storage::{Database, SessionStore, TaskRepository};

use cli::{CliArgs, Mode};

const GREETINGS: [&str; 5] = [
    "Hello, how can I assist you today?",
    "Hi, what can I do for you?",
    "Hey, how can I help you?",
    "Greetings, what can I do for you?",
    "Hello, how can I help you today?",
];

const GOODBYES: [&str; 5] = [
    "See you later!",
    "Goodbye, have a great day!",
    "Goodbye, take care!",
    "Goodbye, see you soon!",
    "Goodbye, have a nice day!",
];

fn pick(lines: &[&'static str]) -> &'static str {
    lines.choose(&mut rand::rng()).copied().unwrap_or("Hello!")
}

/// Read commands until stdin closes or the user says goodbye.
async fn run_repl(orchestrator: Arc<CommandOrchestrator>) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = StdinSource::stdin();
    println!("Aura: {}", pick(&GREETINGS));

    while let Some(command) = input.next_command().await? {
        if is_exit(&command) {
            println!("Aura: {}", pick(&GOODBYES));
            break;
        }
        match orchestrator.handle_command(&command, None).await {
            Ok(reply) => println!("Aura: {}", reply.response),
            Err(e) => {
                tracing::debug!(kind = e.kind(), "Command failed in REPL");
                println!("Aura: {e}");
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mode = args.mode();

    // Config. Load before tracing so the file can pick the log level.
    let config_file = args.resolve_config_path();
    let loaded = AuraConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => AuraConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.general.port = args.resolve_port(config.general.port);

    // Tracing. RUST_LOG wins over the CLI and config level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Aura v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Storage.
    let data_dir = cli::expand_home(&config.general.data_dir);
    let db_path = data_dir.join("aura.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Language model.
    let model: SharedModel = match GeminiClient::from_config(&config.llm) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Language model unavailable");
            return Err(e.into());
        }
    };

    // Command pipeline.
    let registry = Arc::new(ModuleRegistry::with_defaults(
        &config,
        Arc::clone(&db),
        Arc::clone(&model),
    )?);
    tracing::info!(modules = registry.len(), "Module handlers registered");

    let orchestrator = Arc::new(CommandOrchestrator::new(
        model,
        Router::new(config.router.rules.clone()),
        registry,
        SessionManager::new(SessionStore::new(Arc::clone(&db))),
        config.chat.clone(),
    )?);

    // === Background tasks ===

    let notifier = config.notifications.enabled.then(|| {
        let notifier = Arc::new(DeadlineNotifier::new(
            TaskRepository::new(Arc::clone(&db)),
            &config.notifications,
        ));
        let runner = Arc::clone(&notifier);
        tokio::spawn(async move { runner.run().await });
        notifier
    });

    // === Front end ===

    let outcome: Result<(), Box<dyn std::error::Error>> = match mode {
        Mode::Serve => {
            let state = AppState::new(config.clone(), orchestrator);
            routes::start_server(&config, state, shutdown_signal())
                .await
                .map_err(Into::into)
        }
        Mode::Repl => run_repl(orchestrator).await,
    };

    if let Some(notifier) = notifier {
        notifier.shutdown();
    }
    outcome
}
