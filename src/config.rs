//! Flat environment-variable configuration with documented defaults.
//!
//! Every knob is a single env var read once at startup by
//! [`Config::from_env`]. Missing optional values fall back to the
//! defaults listed on each field; missing *required* values (API keys
//! for the selected provider) surface as a fatal [`ConfigError`] when
//! the component that needs them is constructed.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

// ── Categories ──────────────────────────────────────────────────────

/// One classification label with its human-readable description.
#[derive(Debug, Clone)]
pub struct Category {
    pub label: String,
    pub description: String,
}

/// The closed, ordered set of categories plus the subset that triggers
/// an auto-drafted response.
///
/// Declaration order matters: the first label is the safe default when
/// classification fails, and score ties resolve to the earlier label.
#[derive(Debug, Clone)]
pub struct CategorySet {
    categories: Vec<Category>,
    response_labels: Vec<String>,
}

impl CategorySet {
    /// Build a validated set. The response subset must name only
    /// declared labels, and at least one category must be declared.
    pub fn new(
        categories: Vec<Category>,
        response_labels: Vec<String>,
    ) -> std::result::Result<Self, ConfigError> {
        if categories.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "MAIL_CATEGORIES".into(),
                message: "at least one category must be declared".into(),
            });
        }
        for label in &response_labels {
            if !categories.iter().any(|c| &c.label == label) {
                return Err(ConfigError::InvalidValue {
                    key: "RESPONSE_CATEGORIES".into(),
                    message: format!("'{label}' is not a declared category"),
                });
            }
        }
        Ok(Self {
            categories,
            response_labels,
        })
    }

    /// Labels in declaration order.
    pub fn labels(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.label.as_str()).collect()
    }

    /// The first-declared label — the safe default on classifier failure.
    pub fn first_label(&self) -> &str {
        &self.categories[0].label
    }

    /// Whether a label is in the response-required subset.
    pub fn requires_response(&self, label: &str) -> bool {
        self.response_labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self {
            categories: vec![
                Category {
                    label: "urgent response".into(),
                    description: "Emails requiring immediate attention and response".into(),
                },
                Category {
                    label: "not important".into(),
                    description: "Emails that can be safely ignored or processed later".into(),
                },
            ],
            response_labels: vec!["urgent response".into()],
        }
    }
}

// ── Sender identity ─────────────────────────────────────────────────

/// Identity block embedded in reply prompts.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub name: String,
    pub position: String,
    pub contact: String,
    pub company: String,
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self {
            name: "Assistant".into(),
            position: "Assistant".into(),
            contact: String::new(),
            company: String::new(),
        }
    }
}

// ── Component configs ───────────────────────────────────────────────

/// Classifier settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Model identifier for the hosted classification endpoint.
    pub model: String,
    /// API key for the hosted endpoint, if required.
    pub api_key: Option<SecretString>,
    /// Hard character cap applied to the combined subject+body text.
    pub max_text_length: usize,
}

/// Generation-backend settings. One provider is active at a time; the
/// per-provider fields mirror the flat env keys so each backend can
/// resolve its own model and credentials at construction.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Active provider: `ollama`, `openai`, `google`, or `huggingface`.
    pub provider: String,
    pub ollama_model: String,
    pub ollama_api_base: String,
    pub openai_model: String,
    pub openai_api_key: Option<SecretString>,
    pub google_model: String,
    pub google_api_key: Option<SecretString>,
    pub hf_model: String,
    pub hf_api_key: Option<SecretString>,
    /// Inference-provider hint forwarded to the hosted inference API.
    pub hf_provider_hint: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            ollama_model: "qwen2.5-coder".into(),
            ollama_api_base: "http://localhost:11434".into(),
            openai_model: "gpt-3.5-turbo".into(),
            openai_api_key: None,
            google_model: "gemini-pro".into(),
            google_api_key: None,
            hf_model: "mistralai/Mistral-7B-Instruct-v0.2".into(),
            hf_api_key: None,
            hf_provider_hint: "auto".into(),
        }
    }
}

// ── Top-level config ────────────────────────────────────────────────

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationConfig,
    pub classifier: ClassifierConfig,
    pub categories: CategorySet,
    pub identity: SenderIdentity,
    /// Ledger database path. Default `./data/mailtriage.db`.
    pub db_path: PathBuf,
    /// Training CSV path. Default `./email_training_data.csv`.
    pub training_data_path: PathBuf,
    /// Interval between batch runs. Default 15 minutes.
    pub poll_interval: Duration,
    /// Whole-word cap on reply prompts. Default 2000.
    pub max_prompt_words: usize,
    /// Token budget passed to the generation backend. Default 1000.
    pub reply_max_tokens: u32,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let generation = GenerationConfig {
            provider: env_or("LLM_PROVIDER", "ollama"),
            ollama_model: env_or("OLLAMA_MODEL", "qwen2.5-coder"),
            ollama_api_base: env_or("OLLAMA_API_BASE", "http://localhost:11434"),
            openai_model: env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
            openai_api_key: env_secret("OPENAI_API_KEY"),
            google_model: env_or("GOOGLE_MODEL", "gemini-pro"),
            google_api_key: env_secret("GOOGLE_API_KEY"),
            hf_model: env_or("HF_MODEL", "mistralai/Mistral-7B-Instruct-v0.2"),
            hf_api_key: env_secret("HF_API_KEY"),
            hf_provider_hint: env_or("HF_PROVIDER", "auto"),
        };

        let classifier = ClassifierConfig {
            model: env_or("CLASSIFIER_MODEL", "facebook/bart-large-mnli"),
            api_key: env_secret("HF_API_KEY"),
            max_text_length: env_parse("MAX_TEXT_LENGTH", 512)?,
        };

        let categories = match std::env::var("MAIL_CATEGORIES") {
            Ok(raw) => {
                let declared = parse_categories(&raw)?;
                let response = parse_response_labels(
                    &env_or("RESPONSE_CATEGORIES", "urgent response"),
                );
                CategorySet::new(declared, response)?
            }
            Err(_) => CategorySet::default(),
        };

        let identity = SenderIdentity {
            name: env_or("USER_NAME", "Assistant"),
            position: env_or("USER_POSITION", "Assistant"),
            contact: env_or("USER_CONTACT", ""),
            company: env_or("USER_COMPANY", ""),
        };

        let poll_minutes: u64 = env_parse("POLLING_INTERVAL_MINUTES", 15)?;

        Ok(Self {
            generation,
            classifier,
            categories,
            identity,
            db_path: PathBuf::from(env_or("DB_PATH", "./data/mailtriage.db")),
            training_data_path: PathBuf::from(env_or(
                "TRAINING_DATA_PATH",
                "./email_training_data.csv",
            )),
            poll_interval: Duration::from_secs(poll_minutes * 60),
            max_prompt_words: env_parse("MAX_PROMPT_WORDS", 2000)?,
            reply_max_tokens: env_parse("REPLY_MAX_TOKENS", 1000)?,
        })
    }
}

// ── Env helpers ─────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secret(key: &str) -> Option<SecretString> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

fn env_parse<T: std::str::FromStr>(
    key: &str,
    default: T,
) -> std::result::Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse `label=description;label=description` into declared categories.
fn parse_categories(raw: &str) -> std::result::Result<Vec<Category>, ConfigError> {
    let mut categories = Vec::new();
    for entry in raw.split(';').filter(|e| !e.trim().is_empty()) {
        let (label, description) = entry.split_once('=').ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "MAIL_CATEGORIES".into(),
                message: format!("expected 'label=description', got '{entry}'"),
            }
        })?;
        categories.push(Category {
            label: label.trim().to_string(),
            description: description.trim().to_string(),
        });
    }
    Ok(categories)
}

/// Parse a comma-separated list of response-required labels.
fn parse_response_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_category_set_shape() {
        let set = CategorySet::default();
        assert_eq!(set.labels(), vec!["urgent response", "not important"]);
        assert_eq!(set.first_label(), "urgent response");
        assert!(set.requires_response("urgent response"));
        assert!(!set.requires_response("not important"));
    }

    #[test]
    fn response_subset_must_be_declared() {
        let categories = vec![Category {
            label: "spam".into(),
            description: "junk".into(),
        }];
        let result = CategorySet::new(categories, vec!["urgent response".into()]);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn empty_category_set_rejected() {
        let result = CategorySet::new(Vec::new(), Vec::new());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn parse_categories_splits_labels_and_descriptions() {
        let parsed = parse_categories(
            "urgent response=Needs a reply now; not important=Safe to skim later",
        )
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].label, "urgent response");
        assert_eq!(parsed[0].description, "Needs a reply now");
        assert_eq!(parsed[1].label, "not important");
    }

    #[test]
    fn parse_categories_rejects_missing_description() {
        assert!(parse_categories("urgent response").is_err());
    }

    #[test]
    fn parse_response_labels_trims_and_drops_empties() {
        let labels = parse_response_labels("urgent response, , escalation");
        assert_eq!(labels, vec!["urgent response", "escalation"]);
    }
}
