//! Aura LLM crate - language model access.
//!
//! Defines the [`LanguageModel`] trait used by the parser, the synthesizer
//! and the model-backed handlers, a Gemini REST implementation, a scripted
//! model for tests, and helpers that clean model output.

pub mod error;
pub mod gemini;
pub mod mock;
pub mod model;
pub mod text;

pub use error::LlmError;
pub use gemini::GeminiClient;
pub use mock::{RecordedCall, ScriptedModel};
pub use model::{LanguageModel, SharedModel};
pub use text::{clean_reply, strip_code_fences, strip_quotes};
