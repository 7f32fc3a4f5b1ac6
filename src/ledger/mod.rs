//! Processing ledger — durable record of which messages have been
//! seen and which already have a drafted reply.
//!
//! The ledger enforces at-most-once draft creation: ingestion is
//! idempotent on `message_id`, and `draft_created` flips false→true
//! exactly once. Records are never deleted.

mod libsql_backend;
mod migrations;

pub use libsql_backend::LibSqlLedger;

use async_trait::async_trait;

use crate::error::LedgerError;

/// Backend-agnostic ledger interface.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert a processing record iff no record with this `message_id`
    /// exists; otherwise a no-op. An existing record's category is
    /// never overwritten.
    async fn record_if_new(
        &self,
        message_id: &str,
        thread_id: &str,
        subject: &str,
        body: &str,
        category: &str,
    ) -> Result<(), LedgerError>;

    /// True iff a record exists for `message_id` with `draft_created`
    /// set.
    async fn has_draft(&self, message_id: &str) -> Result<bool, LedgerError>;

    /// Set `draft_created` on the existing record. A missing record is
    /// logged rather than failed — it signals an ordering bug upstream,
    /// not a condition the caller can act on.
    async fn mark_draft_created(&self, message_id: &str) -> Result<(), LedgerError>;
}
