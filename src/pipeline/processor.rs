//! Decision pipeline — classify → persist → conditionally respond.
//!
//! Each step is fault-isolated: a failure is logged and either the
//! message degrades to a safe default (classification, generation) or
//! the remaining steps still run (ledger, training log). Nothing in
//! here aborts the batch.
//!
//! Per-message state machine:
//! `Unseen → Classified → {NoResponseNeeded→Read, ResponsePending→DraftCreated}`.
//! `DraftCreated` is terminal — the draft-exists guard prevents
//! re-entry on later passes.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::classifier::CategoryClassifier;
use crate::config::{CategorySet, Config, SenderIdentity};
use crate::ledger::Ledger;
use crate::llm::TextGenerator;
use crate::mailbox::Mailbox;
use crate::pipeline::types::{Disposition, Message};
use crate::text::truncate_words;
use crate::training::TrainingLog;

/// Pipeline knobs that come from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub categories: CategorySet,
    pub identity: SenderIdentity,
    /// Whole-word cap applied to reply prompts.
    pub max_prompt_words: usize,
    /// Token budget forwarded to the generation backend.
    pub reply_max_tokens: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            categories: config.categories.clone(),
            identity: config.identity.clone(),
            max_prompt_words: config.max_prompt_words,
            reply_max_tokens: config.reply_max_tokens,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            categories: CategorySet::default(),
            identity: SenderIdentity::default(),
            max_prompt_words: 2000,
            reply_max_tokens: 1000,
        }
    }
}

/// Processes one message at a time: classify, record, and either draft
/// a reply or clear the unread flag.
pub struct DecisionPipeline {
    classifier: CategoryClassifier,
    generator: Arc<dyn TextGenerator>,
    ledger: Arc<dyn Ledger>,
    training: TrainingLog,
    settings: PipelineSettings,
}

impl DecisionPipeline {
    pub fn new(
        classifier: CategoryClassifier,
        generator: Arc<dyn TextGenerator>,
        ledger: Arc<dyn Ledger>,
        training: TrainingLog,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            classifier,
            generator,
            ledger,
            training,
            settings,
        }
    }

    /// Run the full decision sequence for one fetched message.
    pub async fn process(&self, mailbox: &dyn Mailbox, message: &Message) -> Disposition {
        info!(
            id = %message.id,
            sender = %message.sender,
            subject = %crate::text::truncate_chars(&message.subject, 30),
            "Processing message"
        );

        let category = self
            .classifier
            .classify(&message.subject, &message.body, &self.settings.categories)
            .await;

        // Record and log-for-training. Failures here never block the
        // response decision: the draft guard below is re-checked
        // independently.
        if let Err(e) = self
            .ledger
            .record_if_new(
                &message.id,
                &message.thread_id,
                &message.subject,
                &message.body,
                &category,
            )
            .await
        {
            error!(id = %message.id, error = %e, "Failed to record message");
        }

        if let Err(e) = self
            .training
            .append(&message.subject, &message.body, &category)
        {
            error!(id = %message.id, error = %e, "Failed to append training example");
        }

        let already_drafted = match self.ledger.has_draft(&message.id).await {
            Ok(found) => found,
            Err(e) => {
                error!(id = %message.id, error = %e, "Failed to check draft status");
                false
            }
        };
        if already_drafted {
            info!(id = %message.id, "Draft already created, skipping");
            return Disposition::AlreadyHandled;
        }

        if self.settings.categories.requires_response(&category) {
            self.respond(mailbox, message).await
        } else {
            info!(id = %message.id, category = %category, "No auto-response required, marking read");
            match mailbox.clear_unread(&message.id).await {
                Ok(()) => Disposition::MarkedRead,
                Err(e) => {
                    error!(id = %message.id, error = %e, "Failed to mark message read");
                    Disposition::ReadFailed
                }
            }
        }
    }

    /// Generate a reply and persist it as a draft.
    async fn respond(&self, mailbox: &dyn Mailbox, message: &Message) -> Disposition {
        let prompt = build_reply_prompt(message, &self.settings.identity);
        let prompt = truncate_words(&prompt, self.settings.max_prompt_words);

        let reply = match self
            .generator
            .generate(&prompt, self.settings.reply_max_tokens)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(id = %message.id, error = %e, "Generation failed, using fallback text");
                e.fallback_text()
            }
        };

        let subject = format!("Re: {}", message.subject);
        match mailbox.create_draft(&message.sender, &subject, &reply).await {
            Ok(draft_id) => {
                info!(id = %message.id, draft_id = %draft_id, "Draft created");
                if let Err(e) = self.ledger.mark_draft_created(&message.id).await {
                    // Unmarked: the next pass may draft again.
                    error!(id = %message.id, error = %e, "Failed to record draft creation");
                }
                Disposition::DraftCreated
            }
            Err(e) => {
                // Not marked: a later pass re-enters at the draft guard
                // and retries.
                error!(id = %message.id, error = %e, "Failed to create draft");
                Disposition::DraftFailed
            }
        }
    }
}

/// Reply prompt: the email plus the configured identity block. The
/// model is asked to infer the recipient's name from context.
fn build_reply_prompt(message: &Message, identity: &SenderIdentity) -> String {
    format!(
        "You are a professional assistant. Generate a polite and professional \
         email response based on the following email:\n\
         Subject: {}\n\
         Body: {}\n\
         Your name: \"{}\"\n\
         Your position: \"{}\"\n\
         Your contact: \"{}\"\n\
         Your company: \"{}\"\n\n\
         Take the recipient's name from the context.",
        message.subject,
        message.body,
        identity.name,
        identity.position,
        identity.contact,
        identity.company,
    )
}
