//! Hosted-chat backend — OpenAI-style chat completions.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::GenerationConfig;
use crate::error::{ConfigError, GenerationError};

const API_BASE: &str = "https://api.openai.com/v1";

/// Chat-completion backend. The prompt is sent as a single user turn;
/// `max_tokens` passes through as the API's `max_tokens` field.
#[derive(Debug)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiBackend {
    pub fn new(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            ConfigError::MissingRequired {
                key: "OPENAI_API_KEY".into(),
                hint: "An API key is required for the openai provider.".into(),
            }
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model: config.openai_model.clone(),
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
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
        });

        let response = self
            .http
            .post(format!("{API_BASE}/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::RequestFailed {
                provider: "openai".into(),
                reason: format!("{status}: {body}"),
            });
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| GenerationError::InvalidResponse {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse {
                provider: "openai".into(),
                reason: "response contained no choices".into(),
            })
    }

    pub async fn try_list_models(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .http
            .get(format!("{API_BASE}/models"))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;

        let parsed: ModelsResponse =
            response.json().await.map_err(|e| GenerationError::InvalidResponse {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;
        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }
}
