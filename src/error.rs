//! Error types for mailtriage.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Training log error: {0}")]
    Training(#[from] TrainingError),
}

/// Configuration-related errors. Fatal at startup — never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported LLM provider: {0}")]
    UnknownProvider(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classifier-backend errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Failed to initialize classification model {model}: {reason}")]
    Init { model: String, reason: String },

    #[error("Classification request to {model} failed: {reason}")]
    Request { model: String, reason: String },

    #[error("Invalid response from {model}: {reason}")]
    InvalidResponse { model: String, reason: String },
}

/// Generation-backend errors.
///
/// `fallback_text()` is the value the pipeline substitutes for a failed
/// generation — the decision to degrade lives at the call site, not in
/// an exception handler.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Unsupported configuration on {provider}: {message}")]
    UnsupportedConfiguration { provider: String, message: String },
}

impl GenerationError {
    /// Text a caller can use in place of a generated reply.
    ///
    /// An unsupported-configuration failure carries its own explanation;
    /// everything else degrades to an apology.
    pub fn fallback_text(&self) -> String {
        match self {
            Self::UnsupportedConfiguration { message, .. } => message.clone(),
            other => format!(
                "I apologize, but I'm unable to generate a response at this \
                 time due to a technical issue: {other}"
            ),
        }
    }
}

/// Ledger (persistence) errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Failed to open ledger: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Mailbox collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Mailbox API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode message {id}: {reason}")]
    Decode { id: String, reason: String },
}

impl From<reqwest::Error> for MailboxError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Training-log sink errors.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
