//! Language-model backends.
//!
//! Each backend implements [`GenerationClient`]. The pipeline only sees the
//! trait, so backends are chosen by explicit construction at the call site.

pub mod ollama;

use async_trait::async_trait;
use thiserror::Error;

pub use ollama::OllamaAgent;

/// Failures inside a generation backend.
///
/// These never cross the [`GenerationClient`] boundary: adapters log them and
/// return an empty string.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Could not reach the model backend: {0}")]
    Unreachable(String),

    #[error("Model backend returned an error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Malformed model backend response: {0}")]
    Malformed(String),
}

/// Produces raw work-item JSON from a system prompt and a transcript.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Run one extraction.
    ///
    /// Soft-fail contract: any backend failure is logged and yields `""`.
    /// Callers treat an empty string as "no result".
    async fn generate(&self, system_prompt: &str, transcript: &str) -> String;
}
