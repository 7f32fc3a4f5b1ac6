//! Hosted-generative backend — Google's generative language API.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::GenerationConfig;
use crate::error::{ConfigError, GenerationError};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generative-content backend. `max_tokens` passes through as
/// `maxOutputTokens`.
#[derive(Debug)]
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ListedModel>,
}

#[derive(Debug, Deserialize)]
struct ListedModel {
    name: String,
}

impl GeminiBackend {
    pub fn new(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let api_key = config.google_api_key.clone().ok_or_else(|| {
            ConfigError::MissingRequired {
                key: "GOOGLE_API_KEY".into(),
                hint: "An API key is required for the google provider.".into(),
            }
        })?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model: config.google_model.clone(),
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
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": max_tokens },
        });

        let url = format!(
            "{API_BASE}/models/{}:generateContent?key={}",
            self.model,
            self.api_key.expose_secret(),
        );

        let response = self.http.post(url).json(&body).send().await.map_err(|e| {
            GenerationError::RequestFailed {
                provider: "google".into(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::RequestFailed {
                provider: "google".into(),
                reason: format!("{status}: {body}"),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| GenerationError::InvalidResponse {
                provider: "google".into(),
                reason: e.to_string(),
            })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| GenerationError::InvalidResponse {
                provider: "google".into(),
                reason: "response contained no candidates".into(),
            })
    }

    pub async fn try_list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{API_BASE}/models?key={}", self.api_key.expose_secret());
        let response = self.http.get(url).send().await.map_err(|e| {
            GenerationError::RequestFailed {
                provider: "google".into(),
                reason: e.to_string(),
            }
        })?;

        let parsed: ListModelsResponse =
            response.json().await.map_err(|e| GenerationError::InvalidResponse {
                provider: "google".into(),
                reason: e.to_string(),
            })?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}
