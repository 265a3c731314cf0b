//! Router setup with all API routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use aura_core::config::AuraConfig;
use aura_core::error::AuraError;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Global request body limit.
const BODY_LIMIT: usize = 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{port}"),
        format!("http://localhost:{port}"),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let limiter = RateLimiter::new(state.config.general.rate_limit_per_sec);

    let public_routes = Router::new().route("/health", get(handlers::health));

    let rate_limited_routes = Router::new()
        .route("/command", post(handlers::command))
        .route("/history", get(handlers::history))
        .route("/session", post(handlers::new_session))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    public_routes
        .merge(rate_limited_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on `127.0.0.1:<general.port>` until `shutdown` resolves.
pub async fn start_server<F>(config: &AuraConfig, state: AppState, shutdown: F) -> Result<(), AuraError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("127.0.0.1:{}", config.general.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AuraError::Api(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AuraError::Api(format!("Server error: {e}")))?;

    tracing::info!("API server stopped");
    Ok(())
}
