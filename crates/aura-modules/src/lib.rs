//! Module handlers for Aura.
//!
//! Each module category (tasks, notes, email, media and so on) is served by
//! a [`ModuleHandler`]. The [`ModuleRegistry`] dispatches a parsed intent to
//! its handler with a timeout and folds failures into `{error}` results.
//! Outbound services sit behind the traits in [`client`].

pub mod client;
pub mod error;
pub mod handler;
pub mod notifier;
pub mod time_parser;
pub mod types;

pub use error::{AuthRequired, ModuleError};
pub use handler::{ModuleHandler, ModuleRegistry};
pub use notifier::DeadlineNotifier;
pub use time_parser::{resolve_deadline, resolve_range, DateRange};
pub use types::{HandlerContext, SafetyLevel};
