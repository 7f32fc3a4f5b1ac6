//! Version-tracked migrations for the libSQL ledger.
//!
//! Each migration has a version number and SQL. `run_migrations()`
//! checks the current version and applies only the new ones, in order.

use libsql::Connection;

use crate::error::LedgerError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "emails_table",
    sql: r#"
        CREATE TABLE IF NOT EXISTS emails (
            message_id TEXT PRIMARY KEY,
            thread_id TEXT NOT NULL,
            subject TEXT,
            body TEXT,
            category TEXT,
            draft_created INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_emails_draft_created
            ON emails(draft_created);
    "#,
}];

/// Apply all pending migrations.
pub async fn run_migrations(conn: &Connection) -> Result<(), LedgerError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| LedgerError::Migration(format!("creating _migrations: {e}")))?;

    let current = current_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute_batch(migration.sql)
            .await
            .map_err(|e| {
                LedgerError::Migration(format!(
                    "applying v{} ({}): {e}",
                    migration.version, migration.name
                ))
            })?;
        conn.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![migration.version, migration.name],
        )
        .await
        .map_err(|e| {
            LedgerError::Migration(format!(
                "recording v{} ({}): {e}",
                migration.version, migration.name
            ))
        })?;
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied ledger migration"
        );
    }

    Ok(())
}

async fn current_version(conn: &Connection) -> Result<i64, LedgerError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| LedgerError::Migration(format!("reading version: {e}")))?;
    match rows
        .next()
        .await
        .map_err(|e| LedgerError::Migration(format!("reading version row: {e}")))?
    {
        Some(row) => row
            .get::<i64>(0)
            .map_err(|e| LedgerError::Migration(format!("decoding version: {e}"))),
        None => Ok(0),
    }
}
