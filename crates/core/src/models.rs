//! Domain model types used throughout MergeTrend.
//!
//! These types bridge the replay engine, the persistence sink, and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Branch side
// ---------------------------------------------------------------------------

/// Which side of the historical merge a commit belongs to.
///
/// Branch 1 descends from the merge commit's first parent, branch 2 from the
/// second. The labels are stable for the lifetime of one replay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BranchSide {
    Branch1,
    Branch2,
}

impl std::fmt::Display for BranchSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Branch1 => write!(f, "branch1"),
            Self::Branch2 => write!(f, "branch2"),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-step measurement
// ---------------------------------------------------------------------------

/// The measurement taken after one replay step (or for the base state).
///
/// Conflict counts are the dependent variables; the cumulative branch
/// statistics are the independent variables carried alongside. File-level and
/// line-level conflict counts are independent: a path can conflict at the
/// tree level yet textually auto-resolve to zero lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictMeasurement {
    /// Commit time (UTC) of the advancing commit; base time for the baseline.
    pub timestamp: DateTime<Utc>,
    /// Which branch advanced at this step. `None` for the baseline entry.
    pub advanced: Option<BranchSide>,
    /// Branch 1 frontier commit hash after this step.
    pub commit_branch1: String,
    /// Branch 2 frontier commit hash after this step.
    pub commit_branch2: String,

    /// Files left conflicted by the virtual merge at this step.
    pub conflict_files: usize,
    /// Total lines inside conflict regions, markers included.
    pub conflict_lines: usize,
    /// Number of conflict regions (one per `<<<<<<<` marker).
    pub conflict_hunks: usize,

    /// Commits applied so far on each branch.
    pub commits_branch1: usize,
    pub commits_branch2: usize,
    /// Cumulative added+deleted lines on each branch, and their sum.
    pub loc_branch1: u64,
    pub loc_branch2: u64,
    pub loc_merge: u64,
    /// Cumulative distinct files touched on each branch, and their union.
    pub files_branch1: usize,
    pub files_branch2: usize,
    pub files_merge: usize,
    /// Cumulative distinct authors on each branch, and their union.
    pub authors_branch1: usize,
    pub authors_branch2: usize,
    pub authors_merge: usize,
}

// ---------------------------------------------------------------------------
// Trend record
// ---------------------------------------------------------------------------

/// The full replay time series for one conflicted merge commit.
///
/// `steps[0]` is always a zero-valued baseline representing the merge base
/// itself; each following entry corresponds to exactly one replay step.
/// Immutable once the replay completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendRecord {
    /// Hash of the original conflicted merge commit.
    pub commit: String,
    /// Ordered per-step measurements, baseline first.
    pub steps: Vec<ConflictMeasurement>,
}

// ---------------------------------------------------------------------------
// Scan output
// ---------------------------------------------------------------------------

/// A merge commit found to conflict during a history scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictedMerge {
    pub commit: String,
    /// First line of the commit message.
    pub summary: String,
}

// ---------------------------------------------------------------------------
// Batch run summary
// ---------------------------------------------------------------------------

/// A merge commit whose replay failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedMerge {
    pub commit: String,
    pub error: String,
}

/// Outcome of a batch run over many conflicted merges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Replays that produced a trend record.
    pub completed: usize,
    /// Commits skipped because they were already recorded (resume).
    pub skipped: usize,
    /// Replays that failed, with the reason.
    pub failed: Vec<FailedMerge>,
}

impl RunSummary {
    /// Total number of commits the batch considered.
    pub fn total(&self) -> usize {
        self.completed + self.skipped + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_side_display_and_serde() {
        assert_eq!(BranchSide::Branch1.to_string(), "branch1");
        let json = serde_json::to_string(&BranchSide::Branch2).unwrap();
        assert_eq!(json, "\"branch2\"");
    }

    #[test]
    fn test_run_summary_total() {
        let summary = RunSummary {
            completed: 3,
            skipped: 2,
            failed: vec![FailedMerge {
                commit: "abc".into(),
                error: "no common ancestor".into(),
            }],
        };
        assert_eq!(summary.total(), 6);
    }

    #[test]
    fn test_trend_record_roundtrip() {
        let record = TrendRecord {
            commit: "abc123".into(),
            steps: vec![ConflictMeasurement {
                timestamp: Utc::now(),
                advanced: Some(BranchSide::Branch1),
                commit_branch1: "aaa".into(),
                commit_branch2: "bbb".into(),
                conflict_files: 1,
                conflict_lines: 4,
                conflict_hunks: 1,
                commits_branch1: 1,
                commits_branch2: 0,
                loc_branch1: 2,
                loc_branch2: 0,
                loc_merge: 2,
                files_branch1: 1,
                files_branch2: 0,
                files_merge: 1,
                authors_branch1: 1,
                authors_branch2: 0,
                authors_merge: 1,
            }],
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: TrendRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
