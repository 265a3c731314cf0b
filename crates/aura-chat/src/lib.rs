//! Command pipeline for Aura.
//!
//! Turns free-form text into a structured intent with the language model,
//! routes it through an ordered keyword table to a module handler, and
//! narrates the handler's result. The [`CommandOrchestrator`] is the single
//! entry point shared by the HTTP endpoint and the REPL.

pub mod context;
pub mod error;
pub mod input;
pub mod orchestrator;
pub mod parser;
pub mod response;
pub mod router;

pub use context::{SessionContext, SessionManager};
pub use error::ChatError;
pub use input::{is_exit, InputSource, LineSource, ScriptedSource, StdinSource};
pub use orchestrator::{CommandOrchestrator, CommandReply, RequestState, RequestTrace};
pub use parser::{decode_intent, IntentParser, ParsedCommand, PARSER_TEMPLATE};
pub use response::{build_prompt, ResponseSynthesizer};
pub use router::{Route, Router};
