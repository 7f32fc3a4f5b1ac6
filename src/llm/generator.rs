//! The capability the pipeline depends on for text generation.

use async_trait::async_trait;

use crate::error::GenerationError;

/// A text-generation backend.
///
/// `generate` returns a classified error rather than degraded text —
/// the caller decides what to substitute (see
/// [`GenerationError::fallback_text`]). `list_available_models`
/// degrades to an empty list internally since callers only ever
/// display it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name (`ollama`, `openai`, `google`, `huggingface`).
    fn provider(&self) -> &'static str;

    /// The configured model identifier.
    fn model(&self) -> &str;

    /// Generate text for `prompt`, bounded by `max_tokens` in whatever
    /// unit the backend natively uses.
    async fn generate(&self, prompt: &str, max_tokens: u32)
    -> Result<String, GenerationError>;

    /// Models available on this backend; empty on failure.
    async fn list_available_models(&self) -> Vec<String>;
}
