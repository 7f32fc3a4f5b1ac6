//! Text-generation backends.
//!
//! One [`GenerationBackend`] enum covers the four interchangeable
//! provider kinds:
//! - **LocalModel** — Ollama's local HTTP API
//! - **HostedChat** — OpenAI-style chat completions
//! - **HostedGenerative** — Google's generative language API
//! - **HostedInference** — serverless inference text generation
//!
//! Each variant resolves its own model identifier and credentials from
//! [`GenerationConfig`] at construction; an unknown provider name or a
//! missing required key is fatal there, before any network call. The
//! pipeline depends only on the [`TextGenerator`] trait.

mod gemini;
pub mod generator;
mod huggingface;
mod ollama;
mod openai;

pub use gemini::GeminiBackend;
pub use generator::TextGenerator;
pub use huggingface::HuggingFaceBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::{ConfigError, GenerationError};

/// A configured text-generation backend, tagged by provider kind.
#[derive(Debug)]
pub enum GenerationBackend {
    LocalModel(OllamaBackend),
    HostedChat(OpenAiBackend),
    HostedGenerative(GeminiBackend),
    HostedInference(HuggingFaceBackend),
}

impl GenerationBackend {
    /// Construct the backend named by `config.provider`.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let backend = match config.provider.as_str() {
            "ollama" => Self::LocalModel(OllamaBackend::new(config)?),
            "openai" => Self::HostedChat(OpenAiBackend::new(config)?),
            "google" => Self::HostedGenerative(GeminiBackend::new(config)?),
            "huggingface" => Self::HostedInference(HuggingFaceBackend::new(config)?),
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };
        info!(
            provider = backend.provider_name(),
            model = backend.model_name(),
            "Initialized generation backend"
        );
        Ok(backend)
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::LocalModel(_) => "ollama",
            Self::HostedChat(_) => "openai",
            Self::HostedGenerative(_) => "google",
            Self::HostedInference(_) => "huggingface",
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Self::LocalModel(b) => b.model(),
            Self::HostedChat(b) => b.model(),
            Self::HostedGenerative(b) => b.model(),
            Self::HostedInference(b) => b.model(),
        }
    }
}

#[async_trait]
impl TextGenerator for GenerationBackend {
    fn provider(&self) -> &'static str {
        self.provider_name()
    }

    fn model(&self) -> &str {
        self.model_name()
    }

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        match self {
            Self::LocalModel(b) => b.generate(prompt, max_tokens).await,
            Self::HostedChat(b) => b.generate(prompt, max_tokens).await,
            Self::HostedGenerative(b) => b.generate(prompt, max_tokens).await,
            Self::HostedInference(b) => b.generate(prompt, max_tokens).await,
        }
    }

    async fn list_available_models(&self) -> Vec<String> {
        let result = match self {
            Self::LocalModel(b) => b.try_list_models().await,
            Self::HostedChat(b) => b.try_list_models().await,
            Self::HostedGenerative(b) => b.try_list_models().await,
            Self::HostedInference(b) => b.try_list_models().await,
        };
        match result {
            Ok(models) => models,
            Err(e) => {
                warn!(provider = self.provider_name(), error = %e, "Failed to list models");
                Vec::new()
            }
        }
    }
}
