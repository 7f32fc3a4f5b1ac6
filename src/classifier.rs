//! Category classifier — maps (subject, body) onto one label from a
//! configured category set.
//!
//! The scoring model sits behind the [`ScoreModel`] trait. The shipped
//! implementation calls a hosted zero-shot classification endpoint;
//! tests inject mocks. The model session is created lazily on first
//! use and reused for every later call; a failed initialization leaves
//! the slot empty so the next call simply retries.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{CategorySet, ClassifierConfig};
use crate::error::ClassifierError;
use crate::text::truncate_chars;

/// Scoring backend: one score per label, in label order.
#[async_trait]
pub trait ScoreModel: Send + Sync {
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<f32>, ClassifierError>;
}

// ── Hosted zero-shot scorer ─────────────────────────────────────────

const INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models";

/// Zero-shot classification session against the hosted inference API.
struct HostedScorer {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HostedScorer {
    fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClassifierError::Init {
                model: config.model.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            url: format!("{INFERENCE_API_BASE}/{}", config.model),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f32>,
}

#[async_trait]
impl ScoreModel for HostedScorer {
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<f32>, ClassifierError> {
        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "candidate_labels": labels },
        });

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| ClassifierError::Request {
            model: self.model.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Request {
                model: self.model.clone(),
                reason: format!("{status}: {body}"),
            });
        }

        let parsed: ZeroShotResponse =
            response.json().await.map_err(|e| ClassifierError::InvalidResponse {
                model: self.model.clone(),
                reason: e.to_string(),
            })?;

        // The endpoint returns labels sorted by score; map them back
        // into declared order.
        labels
            .iter()
            .map(|label| {
                parsed
                    .labels
                    .iter()
                    .position(|l| l == label)
                    .and_then(|i| parsed.scores.get(i).copied())
                    .ok_or_else(|| ClassifierError::InvalidResponse {
                        model: self.model.clone(),
                        reason: format!("no score returned for label '{label}'"),
                    })
            })
            .collect()
    }
}

// ── Classifier ──────────────────────────────────────────────────────

/// Maps an email onto exactly one category label.
pub struct CategoryClassifier {
    config: ClassifierConfig,
    session: Mutex<Option<Arc<dyn ScoreModel>>>,
}

impl CategoryClassifier {
    /// Classifier backed by the hosted scoring endpoint. The session
    /// is not created until the first classification.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Classifier with a pre-seeded scoring model (tests, alternative
    /// backends).
    pub fn with_model(config: ClassifierConfig, model: Arc<dyn ScoreModel>) -> Self {
        Self {
            config,
            session: Mutex::new(Some(model)),
        }
    }

    /// Get or lazily create the model session.
    async fn session(&self) -> Result<Arc<dyn ScoreModel>, ClassifierError> {
        let mut slot = self.session.lock().await;
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model: Arc<dyn ScoreModel> = Arc::new(HostedScorer::new(&self.config)?);
        info!(model = %self.config.model, "Initialized classification model");
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Classify an email. Never fails: any backend fault degrades to
    /// the set's first-declared label, with the cause logged.
    pub async fn classify(&self, subject: &str, body: &str, set: &CategorySet) -> String {
        match self.try_classify(subject, body, set).await {
            Ok(label) => label,
            Err(e) => {
                warn!(error = %e, "Classification failed, using default category");
                set.first_label().to_string()
            }
        }
    }

    /// Classify an email, surfacing backend faults to the caller.
    pub async fn try_classify(
        &self,
        subject: &str,
        body: &str,
        set: &CategorySet,
    ) -> Result<String, ClassifierError> {
        let combined = format!("Subject: {subject}\n\nBody: {body}");
        let truncated = truncate_chars(&combined, self.config.max_text_length);

        let labels = set.labels();
        let model = self.session().await?;
        let scores = model.score(&truncated, &labels).await?;

        if scores.len() != labels.len() {
            return Err(ClassifierError::InvalidResponse {
                model: self.config.model.clone(),
                reason: format!(
                    "expected {} scores, got {}",
                    labels.len(),
                    scores.len()
                ),
            });
        }

        // Highest score wins; a strict comparison keeps the earlier
        // label on ties.
        let mut best = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }

        debug!(
            subject = %truncate_chars(subject, 30),
            category = labels[best],
            score = scores[best],
            "Categorized email"
        );
        Ok(labels[best].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config() -> ClassifierConfig {
        ClassifierConfig {
            model: "test-model".into(),
            api_key: None,
            max_text_length: 512,
        }
    }

    /// Returns fixed scores, recording the text it was asked to score.
    struct FixedScorer {
        scores: Vec<f32>,
        calls: AtomicUsize,
        last_text: std::sync::Mutex<String>,
    }

    impl FixedScorer {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
                last_text: std::sync::Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl ScoreModel for FixedScorer {
        async fn score(
            &self,
            text: &str,
            _labels: &[&str],
        ) -> Result<Vec<f32>, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_text.lock().unwrap() = text.to_string();
            Ok(self.scores.clone())
        }
    }

    /// Fails every call.
    struct BrokenScorer;

    #[async_trait]
    impl ScoreModel for BrokenScorer {
        async fn score(
            &self,
            _text: &str,
            _labels: &[&str],
        ) -> Result<Vec<f32>, ClassifierError> {
            Err(ClassifierError::Request {
                model: "broken".into(),
                reason: "backend down".into(),
            })
        }
    }

    #[tokio::test]
    async fn picks_highest_scoring_category() {
        let scorer = Arc::new(FixedScorer::new(vec![0.1, 0.9]));
        let classifier = CategoryClassifier::with_model(test_config(), scorer);
        let set = CategorySet::default();

        let label = classifier.classify("Server down", "prod is on fire", &set).await;
        assert_eq!(label, "not important");
    }

    #[tokio::test]
    async fn tie_resolves_to_first_declared() {
        let scorer = Arc::new(FixedScorer::new(vec![0.5, 0.5]));
        let classifier = CategoryClassifier::with_model(test_config(), scorer);
        let set = CategorySet::default();

        let label = classifier.classify("Hi", "hello", &set).await;
        assert_eq!(label, "urgent response");
    }

    #[tokio::test]
    async fn broken_backend_returns_first_category_every_time() {
        let classifier =
            CategoryClassifier::with_model(test_config(), Arc::new(BrokenScorer));
        let set = CategorySet::default();

        for subject in ["a", "b", "c"] {
            let label = classifier.classify(subject, "body", &set).await;
            assert_eq!(label, "urgent response");
        }
    }

    #[tokio::test]
    async fn score_count_mismatch_degrades_to_default() {
        let scorer = Arc::new(FixedScorer::new(vec![0.9]));
        let classifier = CategoryClassifier::with_model(test_config(), scorer);
        let set = CategorySet::default();

        let label = classifier.classify("Hi", "hello", &set).await;
        assert_eq!(label, "urgent response");
    }

    #[tokio::test]
    async fn combined_text_is_char_truncated() {
        let scorer = Arc::new(FixedScorer::new(vec![0.9, 0.1]));
        let classifier = CategoryClassifier::with_model(
            test_config(),
            scorer.clone() as Arc<dyn ScoreModel>,
        );
        let set = CategorySet::default();

        let long_body = "x".repeat(2000);
        classifier.classify("subject", &long_body, &set).await;

        let seen = scorer.last_text.lock().unwrap().clone();
        assert_eq!(seen.chars().count(), 512);
        assert!(seen.starts_with("Subject: subject"));
    }

    #[tokio::test]
    async fn session_reused_across_calls() {
        let scorer = Arc::new(FixedScorer::new(vec![0.9, 0.1]));
        let classifier = CategoryClassifier::with_model(
            test_config(),
            scorer.clone() as Arc<dyn ScoreModel>,
        );
        let set = CategorySet::default();

        classifier.classify("one", "body", &set).await;
        classifier.classify("two", "body", &set).await;
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);
    }
}
