//! Hosted-inference backend — text generation over the serverless
//! inference API.
//!
//! This backend carries the adapter's quirk-tolerance pattern: an
//! optional inference-provider hint is sent with the request, and two
//! classes of rejection are handled rather than propagated raw:
//! - the endpoint rejects the hint *parameter itself* → retry exactly
//!   once without it;
//! - the endpoint reports the hinted provider as unsupported → a
//!   descriptive configuration message, not an apology.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::warn;

use crate::config::GenerationConfig;
use crate::error::{ConfigError, GenerationError};

const INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models";

/// Inference providers the hosted API accepts for the hint parameter.
const KNOWN_PROVIDERS: &str = "'auto', 'black-forest-labs', 'cerebras', 'cohere', \
     'fal-ai', 'fireworks-ai', 'hf-inference', 'hyperbolic', 'nebius', 'novita', \
     'openai', 'replicate', 'sambanova', 'together'";

#[derive(Debug)]
pub struct HuggingFaceBackend {
    http: reqwest::Client,
    model: String,
    api_key: Option<SecretString>,
    /// Provider hint forwarded with requests. `auto` means "let the
    /// API choose" and is not sent at all.
    provider_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

impl HuggingFaceBackend {
    pub fn new(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let provider_hint = match config.hf_provider_hint.trim() {
            "" | "auto" => None,
            hint => Some(hint.to_string()),
        };
        Ok(Self {
            http,
            model: config.hf_model.clone(),
            api_key: config.hf_api_key.clone(),
            provider_hint,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str, max_tokens: u32, with_hint: bool) -> serde_json::Value {
        let mut parameters = serde_json::json!({ "max_new_tokens": max_tokens });
        if with_hint {
            if let Some(hint) = &self.provider_hint {
                parameters["provider"] = serde_json::Value::String(hint.clone());
            }
        }
        serde_json::json!({ "inputs": prompt, "parameters": parameters })
    }

    async fn post_generate(
        &self,
        body: &serde_json::Value,
    ) -> Result<String, (u16, String)> {
        let mut request = self
            .http
            .post(format!("{INFERENCE_API_BASE}/{}", self.model))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| (0u16, e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(text)
        } else {
            Err((status.as_u16(), text))
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let first = self
            .post_generate(&self.request_body(prompt, max_tokens, true))
            .await;

        let raw = match first {
            Ok(raw) => raw,
            Err((status, body)) => {
                if self.provider_hint.is_some() && is_parameter_rejection(&body) {
                    // The endpoint doesn't know the hint parameter —
                    // one retry without it.
                    warn!(
                        model = %self.model,
                        "Provider hint parameter rejected, retrying without it"
                    );
                    self.post_generate(&self.request_body(prompt, max_tokens, false))
                        .await
                        .map_err(|(status, body)| GenerationError::RequestFailed {
                            provider: "huggingface".into(),
                            reason: format!("{status}: {body}"),
                        })?
                } else if is_unsupported_provider(&body) {
                    return Err(GenerationError::UnsupportedConfiguration {
                        provider: "huggingface".into(),
                        message: unsupported_provider_message(
                            self.provider_hint.as_deref().unwrap_or("auto"),
                        ),
                    });
                } else {
                    return Err(GenerationError::RequestFailed {
                        provider: "huggingface".into(),
                        reason: format!("{status}: {body}"),
                    });
                }
            }
        };

        parse_generated_text(&raw).ok_or_else(|| GenerationError::InvalidResponse {
            provider: "huggingface".into(),
            reason: format!("unexpected response shape: {}", crate::text::truncate_chars(&raw, 200)),
        })
    }

    /// The inference API has no cheap model-listing endpoint; the
    /// configured model is the whole catalog.
    pub async fn try_list_models(&self) -> Result<Vec<String>, GenerationError> {
        Ok(vec![self.model.clone()])
    }
}

/// Extract generated text from either the array or object response form.
fn parse_generated_text(raw: &str) -> Option<String> {
    if let Ok(items) = serde_json::from_str::<Vec<GeneratedText>>(raw) {
        return items.into_iter().next().map(|g| g.generated_text);
    }
    serde_json::from_str::<GeneratedText>(raw)
        .ok()
        .map(|g| g.generated_text)
}

/// Does this error body report an unknown/unexpected request parameter?
fn is_parameter_rejection(body: &str) -> bool {
    let body = body.to_lowercase();
    (body.contains("unexpected") || body.contains("unknown"))
        && (body.contains("parameter") || body.contains("argument") || body.contains("field"))
}

/// Does this error body report the hinted provider as unsupported?
fn is_unsupported_provider(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("provider") && body.contains("not supported")
}

fn unsupported_provider_message(hint: &str) -> String {
    format!(
        "Unable to generate text due to a provider configuration issue. \
         The '{hint}' provider is not supported by the inference API. \
         Please check the HF_PROVIDER setting and ensure you're using a \
         supported provider. Valid providers include: {KNOWN_PROVIDERS}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_hint(hint: &str) -> HuggingFaceBackend {
        let config = GenerationConfig {
            hf_provider_hint: hint.into(),
            ..GenerationConfig::default()
        };
        HuggingFaceBackend::new(&config).unwrap()
    }

    #[test]
    fn auto_hint_is_not_sent() {
        let backend = backend_with_hint("auto");
        assert!(backend.provider_hint.is_none());
        let body = backend.request_body("hi", 100, true);
        assert!(body["parameters"].get("provider").is_none());
    }

    #[test]
    fn explicit_hint_is_sent_and_strippable() {
        let backend = backend_with_hint("nscale");
        let with = backend.request_body("hi", 100, true);
        assert_eq!(with["parameters"]["provider"], "nscale");
        let without = backend.request_body("hi", 100, false);
        assert!(without["parameters"].get("provider").is_none());
        assert_eq!(without["parameters"]["max_new_tokens"], 100);
    }

    #[test]
    fn parameter_rejection_detected() {
        assert!(is_parameter_rejection(
            r#"{"error": "unexpected keyword argument 'provider'"}"#
        ));
        assert!(is_parameter_rejection(
            r#"{"error": "unknown field `provider`"}"#
        ));
        assert!(!is_parameter_rejection(r#"{"error": "model overloaded"}"#));
    }

    #[test]
    fn unsupported_provider_detected() {
        assert!(is_unsupported_provider(
            r#"{"error": "Provider 'nscale' not supported"}"#
        ));
        assert!(!is_unsupported_provider(r#"{"error": "rate limited"}"#));
    }

    #[test]
    fn unsupported_provider_message_names_hint_and_alternatives() {
        let message = unsupported_provider_message("nscale");
        assert!(message.contains("'nscale'"));
        assert!(message.contains("hf-inference"));
        assert!(message.contains("HF_PROVIDER"));
    }

    #[test]
    fn parses_array_and_object_responses() {
        assert_eq!(
            parse_generated_text(r#"[{"generated_text": "hello"}]"#).as_deref(),
            Some("hello")
        );
        assert_eq!(
            parse_generated_text(r#"{"generated_text": "hi"}"#).as_deref(),
            Some("hi")
        );
        assert!(parse_generated_text(r#"{"error": "boom"}"#).is_none());
    }
}
