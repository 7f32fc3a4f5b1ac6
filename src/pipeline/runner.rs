//! Batch runner — one pass over all currently-unread messages.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::mailbox::Mailbox;
use crate::pipeline::processor::DecisionPipeline;

/// Applies the decision pipeline to every unread message, one at a
/// time, with per-message fault isolation. A failure listing the
/// mailbox aborts the whole batch; a failure on one message never
/// touches its siblings.
pub struct BatchRunner {
    pipeline: DecisionPipeline,
}

impl BatchRunner {
    pub fn new(pipeline: DecisionPipeline) -> Self {
        Self { pipeline }
    }

    /// Run one batch. Returns the number of messages processed.
    pub async fn run_once(&self, mailbox: &dyn Mailbox) -> usize {
        let refs = match mailbox.list_unread().await {
            Ok(refs) => refs,
            Err(e) => {
                error!(error = %e, "Failed to list unread messages");
                return 0;
            }
        };

        if refs.is_empty() {
            info!("No unread messages found");
            return 0;
        }
        info!(count = refs.len(), "Found unread messages to process");

        let mut seen = HashSet::new();
        let mut processed = 0;
        for message_ref in refs {
            // The mailbox may list a message more than once; process
            // each id at most once per batch.
            if !seen.insert(message_ref.id.clone()) {
                debug!(id = %message_ref.id, "Duplicate listing entry skipped");
                continue;
            }

            let message = match mailbox.get(&message_ref.id).await {
                Ok(message) => message,
                Err(e) => {
                    error!(id = %message_ref.id, error = %e, "Failed to fetch message");
                    continue;
                }
            };

            let disposition = self.pipeline.process(mailbox, &message).await;
            debug!(
                id = %message.id,
                outcome = disposition.label(),
                "Message handled"
            );
            processed += 1;
        }

        info!(processed, "Batch complete");
        processed
    }
}
