//! Local-model backend — Ollama's HTTP API.

use serde::Deserialize;

use crate::config::GenerationConfig;
use crate::error::{ConfigError, GenerationError};

/// Ollama backend: `/api/generate` for text, `/api/tags` for models.
#[derive(Debug)]
pub struct OllamaBackend {
    http: reqwest::Client,
    api_base: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

impl OllamaBackend {
    pub fn new(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            api_base: config.ollama_api_base.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": max_tokens },
        });

        let response = self
            .http
            .post(format!("{}/api/generate", self.api_base))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                provider: "ollama".into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::RequestFailed {
                provider: "ollama".into(),
                reason: format!("{status}: {body}"),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| GenerationError::InvalidResponse {
                provider: "ollama".into(),
                reason: e.to_string(),
            })?;
        Ok(parsed.response)
    }

    pub async fn try_list_models(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.api_base))
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                provider: "ollama".into(),
                reason: e.to_string(),
            })?;

        let parsed: TagsResponse =
            response.json().await.map_err(|e| GenerationError::InvalidResponse {
                provider: "ollama".into(),
                reason: e.to_string(),
            })?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}
