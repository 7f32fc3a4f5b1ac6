use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use mailtriage::classifier::CategoryClassifier;
use mailtriage::config::Config;
use mailtriage::ledger::{Ledger, LibSqlLedger};
use mailtriage::llm::{GenerationBackend, TextGenerator};
use mailtriage::mailbox::GmailMailbox;
use mailtriage::pipeline::{BatchRunner, DecisionPipeline, PipelineSettings};
use mailtriage::training::TrainingLog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    // The credential provider is external: an OAuth access token with
    // mailbox-modify scope must already exist in the environment.
    let access_token = std::env::var("GMAIL_ACCESS_TOKEN")
        .context("GMAIL_ACCESS_TOKEN not set — export a Gmail OAuth access token")?;

    let generator: Arc<dyn TextGenerator> =
        Arc::new(GenerationBackend::from_config(&config.generation)?);
    let classifier = CategoryClassifier::new(config.classifier.clone());
    let ledger: Arc<dyn Ledger> = Arc::new(LibSqlLedger::open_local(&config.db_path).await?);

    let training = TrainingLog::new(config.training_data_path.clone());
    training
        .ensure_initialized()
        .context("Failed to initialize training data file")?;

    let mailbox = GmailMailbox::new(SecretString::from(access_token))?;

    eprintln!("📬 mailtriage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Provider: {} ({})", generator.provider(), generator.model());
    eprintln!("   Classifier: {}", config.classifier.model);
    eprintln!("   Ledger: {}", config.db_path.display());
    eprintln!("   Training data: {}", config.training_data_path.display());
    eprintln!(
        "   Polling every {} minute(s)\n",
        config.poll_interval.as_secs() / 60
    );

    let settings = PipelineSettings::from_config(&config);
    let pipeline = DecisionPipeline::new(classifier, generator, ledger, training, settings);
    let runner = BatchRunner::new(pipeline);

    // First tick fires immediately, then every poll interval. The tick
    // is awaited serially, so batches never overlap.
    let mut tick = tokio::time::interval(config.poll_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        runner.run_once(&mailbox).await;
    }
}
