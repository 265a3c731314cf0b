//! Aura API crate - axum HTTP surface for the command pipeline.
//!
//! `POST /command` runs a command through the same orchestrator the REPL
//! uses. `GET /health`, `GET /history` and `POST /session` expose the
//! active session.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
