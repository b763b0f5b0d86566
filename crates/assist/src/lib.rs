//! Message summaries and reply drafts.
//!
//! [`AiAssist`] tries the configured inference backend (Gemini or Ollama)
//! under a timeout and falls back to a deterministic local algorithm when the
//! backend is missing, unreachable or failing. Only an empty input is ever
//! reported as an error.

pub mod assist;
pub mod backend;
pub mod error;
pub mod fallback;
pub mod gemini;
pub mod ollama;
pub mod prompt;

pub use {
    assist::{AiAssist, AiStatus, Draft, DraftRequest, Summary},
    backend::{BackendStatus, Generation, InferenceBackend, Task},
    error::{AssistError, InferenceError},
};
