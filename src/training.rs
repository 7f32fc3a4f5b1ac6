//! Training-data sink — append-only CSV of (subject, body, category).
//!
//! Not authoritative state: rows feed future model retraining and are
//! never read back by this system. The file is created with its header
//! row before the first append.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::TrainingError;

/// Append-only CSV log.
pub struct TrainingLog {
    path: PathBuf,
}

impl TrainingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the file (and parent directories) with the header row if
    /// it does not exist yet.
    pub fn ensure_initialized(&self) -> Result<(), TrainingError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(["subject", "body", "category"])?;
        writer.flush()?;
        info!(path = %self.path.display(), "Created training data file");
        Ok(())
    }

    /// Append one training example.
    pub fn append(
        &self,
        subject: &str,
        body: &str,
        category: &str,
    ) -> Result<(), TrainingError> {
        self.ensure_initialized()?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record([subject, body, category])?;
        writer.flush()?;
        debug!(category, "Appended training example");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_rows(path: &std::path::Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn initialization_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let log = TrainingLog::new(&path);

        log.ensure_initialized().unwrap();
        log.ensure_initialized().unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows, vec![vec!["subject", "body", "category"]]);
    }

    #[test]
    fn append_creates_file_with_header_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/training.csv");
        let log = TrainingLog::new(&path);

        log.append("Server down", "prod is on fire", "urgent response")
            .unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["subject", "body", "category"]);
        assert_eq!(
            rows[1],
            vec!["Server down", "prod is on fire", "urgent response"]
        );
    }

    #[test]
    fn fields_with_commas_and_newlines_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let log = TrainingLog::new(&path);

        log.append("Hi, team", "line one\nline two", "not important")
            .unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[1][0], "Hi, team");
        assert_eq!(rows[1][1], "line one\nline two");
    }

    #[test]
    fn appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let log = TrainingLog::new(&path);

        log.append("a", "b", "urgent response").unwrap();
        log.append("c", "d", "not important").unwrap();

        assert_eq!(read_rows(&path).len(), 3);
    }
}
