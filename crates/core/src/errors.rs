//! Error types for the MergeTrend core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`TrendError`] enum unifies them all for callers that want a
//! single error type.
//!
//! Propagation policy: errors local to one merge commit never abort a batch
//! run. The batch driver records the offending commit hash and continues.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum TrendError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    TextMerge(#[from] TextMergeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// History errors
// ---------------------------------------------------------------------------

/// Errors from commit-graph traversal and object reads.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A commit hash could not be resolved.
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// A referenced tree or blob cannot be read from the object store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The two parents of a merge commit share no common history.
    #[error("no common ancestor between {parent1} and {parent2}")]
    NoCommonAncestor {
        parent1: String,
        parent2: String,
    },

    /// The commit given for replay does not have exactly two parents.
    #[error("commit {sha} is not a two-parent merge (has {parents} parent(s))")]
    NotAMergeCommit {
        sha: String,
        parents: usize,
    },

    /// The parent-link traversal never reached the merge base.
    #[error("no ancestry path from {from} to base {base}")]
    PathNotFound {
        from: String,
        base: String,
    },

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),
}

// ---------------------------------------------------------------------------
// Merge evaluation errors
// ---------------------------------------------------------------------------

/// Errors from the in-memory three-way tree merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The virtual merge index could not be constructed.
    #[error("merge evaluation failed for base {base}: {detail}")]
    EvaluationFailed {
        base: String,
        detail: String,
    },

    /// A stage blob referenced by a conflict entry cannot be read.
    #[error("conflict stage blob missing for '{path}': {detail}")]
    StageBlobMissing {
        path: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Text merge errors
// ---------------------------------------------------------------------------

/// Errors from the line-level three-way text merge primitive.
///
/// A merge that *produces conflicts* is not an error; these cover abnormal
/// termination only.
#[derive(Debug, Error)]
pub enum TextMergeError {
    /// The external merge tool could not be spawned (after one retry).
    #[error("failed to spawn '{tool}': {detail}")]
    SpawnFailed {
        tool: String,
        detail: String,
    },

    /// The external merge tool terminated abnormally (signal, negative exit).
    #[error("'{tool}' terminated abnormally: {detail}")]
    AbnormalExit {
        tool: String,
        detail: String,
    },

    /// Temp-file plumbing for the external tool failed.
    #[error("text merge I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

/// Errors from trend persistence.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Serialization failure.
    #[error("trend serialization failed: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Generic I/O error writing or reading the output file.
    #[error("sink I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = HistoryError::CommitNotFound("deadbeef".into());
        assert_eq!(err.to_string(), "commit not found: deadbeef");

        let err = HistoryError::NoCommonAncestor {
            parent1: "aaa".into(),
            parent2: "bbb".into(),
        };
        assert!(err.to_string().contains("no common ancestor"));

        let err = HistoryError::NotAMergeCommit {
            sha: "ccc".into(),
            parents: 1,
        };
        assert!(err.to_string().contains("1 parent"));

        let err = TextMergeError::AbnormalExit {
            tool: "git merge-file".into(),
            detail: "killed by signal 9".into(),
        };
        assert!(err.to_string().contains("abnormally"));
    }

    #[test]
    fn test_trend_error_from_subsystem() {
        let hist = HistoryError::CommitNotFound("abc".into());
        let err: TrendError = hist.into();
        assert!(matches!(err, TrendError::History(_)));

        let merge = MergeError::EvaluationFailed {
            base: "abc".into(),
            detail: "tree missing".into(),
        };
        let err: TrendError = merge.into();
        assert!(matches!(err, TrendError::Merge(_)));
    }
}
