//! Trend persistence.
//!
//! [`TrendSink`] is the seam for durable storage of a batch's trend records.
//! The shipped implementation writes a JSON array preserving the shape
//! `[{commit, steps: [...]}, ...]`; the encoding is incidental, the shape is
//! the contract.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::SinkError;
use crate::models::TrendRecord;

/// Destination for a completed batch of trend records.
pub trait TrendSink {
    fn write_all(&self, records: &[TrendRecord]) -> Result<(), SinkError>;
}

/// JSON file sink.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the records already present in the output file, if any.
    ///
    /// A missing file is an empty prior run, not an error.
    pub fn load_existing(&self) -> Result<Vec<TrendRecord>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        let records: Vec<TrendRecord> = serde_json::from_str(&data)?;
        debug!(path = %self.path.display(), records = records.len(), "loaded existing trends");
        Ok(records)
    }

    /// Commit hashes already recorded, for resuming an interrupted batch.
    pub fn recorded_hashes(&self) -> Result<HashSet<String>, SinkError> {
        Ok(self
            .load_existing()?
            .into_iter()
            .map(|r| r.commit)
            .collect())
    }
}

impl TrendSink for JsonFileSink {
    fn write_all(&self, records: &[TrendRecord]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)?;
        info!(
            path = %self.path.display(),
            records = records.len(),
            "trend records written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(commit: &str) -> TrendRecord {
        TrendRecord {
            commit: commit.to_string(),
            steps: vec![crate::models::ConflictMeasurement {
                timestamp: Utc::now(),
                advanced: None,
                commit_branch1: "base".into(),
                commit_branch2: "base".into(),
                conflict_files: 0,
                conflict_lines: 0,
                conflict_hunks: 0,
                commits_branch1: 0,
                commits_branch2: 0,
                loc_branch1: 0,
                loc_branch2: 0,
                loc_merge: 0,
                files_branch1: 0,
                files_branch2: 0,
                files_merge: 0,
                authors_branch1: 0,
                authors_branch2: 0,
                authors_merge: 0,
            }],
        }
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("trends.json"));

        sink.write_all(&[record("aaa"), record("bbb")]).unwrap();

        let loaded = sink.load_existing().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].commit, "aaa");

        let hashes = sink.recorded_hashes().unwrap();
        assert!(hashes.contains("aaa") && hashes.contains("bbb"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("absent.json"));
        assert!(sink.load_existing().unwrap().is_empty());
        assert!(sink.recorded_hashes().unwrap().is_empty());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("nested/out/trends.json"));
        sink.write_all(&[record("ccc")]).unwrap();
        assert!(sink.path().exists());
    }
}
