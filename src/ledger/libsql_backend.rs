//! libSQL ledger backend.
//!
//! Supports local file and in-memory databases. `libsql::Connection`
//! is `Send + Sync` and safe for concurrent async use; each mutation
//! here is a single atomic statement, so a failed write leaves no
//! partial record.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::ledger::{Ledger, migrations};

/// libSQL-backed ledger.
pub struct LibSqlLedger {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlLedger {
    /// Open (or create) a local database file and run migrations.
    pub async fn open_local(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Open(format!("creating ledger directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LedgerError::Open(format!("opening {}: {e}", path.display())))?;
        let conn = db
            .connect()
            .map_err(|e| LedgerError::Open(format!("connecting: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Ledger opened");
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// In-memory ledger (tests).
    pub async fn open_memory() -> Result<Self, LedgerError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| LedgerError::Open(format!("opening in-memory: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| LedgerError::Open(format!("connecting: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl Ledger for LibSqlLedger {
    async fn record_if_new(
        &self,
        message_id: &str,
        thread_id: &str,
        subject: &str,
        body: &str,
        category: &str,
    ) -> Result<(), LedgerError> {
        let affected = self
            .conn
            .execute(
                "INSERT INTO emails
                     (message_id, thread_id, subject, body, category, draft_created, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                 ON CONFLICT(message_id) DO NOTHING",
                params![
                    message_id,
                    thread_id,
                    subject,
                    body,
                    category,
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("record_if_new: {e}")))?;

        if affected == 0 {
            debug!(id = message_id, "Message already recorded");
        } else {
            info!(id = message_id, category, "Recorded message");
        }
        Ok(())
    }

    async fn has_draft(&self, message_id: &str) -> Result<bool, LedgerError> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM emails WHERE message_id = ?1 AND draft_created = 1",
                params![message_id],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("has_draft: {e}")))?;
        let found = rows
            .next()
            .await
            .map_err(|e| LedgerError::Query(format!("has_draft row: {e}")))?
            .is_some();
        Ok(found)
    }

    async fn mark_draft_created(&self, message_id: &str) -> Result<(), LedgerError> {
        let affected = self
            .conn
            .execute(
                "UPDATE emails SET draft_created = 1 WHERE message_id = ?1",
                params![message_id],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("mark_draft_created: {e}")))?;

        if affected == 0 {
            warn!(
                id = message_id,
                "Tried to mark a draft for an unrecorded message"
            );
        } else {
            debug!(id = message_id, "Marked draft created");
        }
        Ok(())
    }
}
