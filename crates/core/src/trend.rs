//! Trend aggregation: the per-commit replay loop and the batch driver.
//!
//! [`compute_trend`] replays one conflicted merge from its base, producing a
//! [`TrendRecord`]; [`compute_all_trends`] runs many replays on a rayon
//! worker pool. Replays share nothing but read-only repository access, so
//! each worker opens its own `HistoryProvider`.
//!
//! Running branch totals are carried in an explicit [`BranchStats`] value
//! folded over the step sequence; each step's statistics are a pure function
//! of the previous accumulator and the new commit's metrics.

use std::collections::HashSet;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::errors::TrendError;
use crate::history::{ChangeStats, CommitRef, HistoryProvider};
use crate::merge::{analyzer, evaluator, ConflictCounts, TextMerger};
use crate::models::{
    BranchSide, ConflictMeasurement, FailedMerge, RunSummary, TrendRecord,
};
use crate::replay::interleave;
use crate::resolver::resolve_branch_paths;

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Progress/outcome callbacks for a batch run.
///
/// Injected by the caller (the CLI wires this to a progress bar); replaces
/// any ambient global reporting. Implementations must be thread-safe, as
/// callbacks arrive from worker threads.
pub trait ReplayObserver: Send + Sync {
    fn merge_completed(&self, _commit: &str, _steps: usize) {}
    fn merge_failed(&self, _commit: &str, _error: &TrendError) {}
    fn merge_skipped(&self, _commit: &str) {}
}

/// Observer that ignores all events.
pub struct NullObserver;

impl ReplayObserver for NullObserver {}

// ---------------------------------------------------------------------------
// Branch accumulator
// ---------------------------------------------------------------------------

/// Running totals for one branch of the replay.
///
/// Every field is monotonically non-decreasing across that branch's steps and
/// carried forward unchanged when the other branch advances.
#[derive(Debug, Clone, Default)]
pub(crate) struct BranchStats {
    pub commits: usize,
    pub loc: u64,
    pub files: HashSet<String>,
    pub authors: HashSet<String>,
}

impl BranchStats {
    /// Fold one commit's metrics into the accumulator.
    pub fn advance(mut self, changes: &ChangeStats, author: &str) -> Self {
        self.commits += 1;
        self.loc += changes.loc;
        self.files.extend(changes.files.iter().cloned());
        self.authors.insert(author.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Single-commit replay
// ---------------------------------------------------------------------------

/// Replay one conflicted merge commit and produce its trend time series.
///
/// Pure function of immutable history: re-running against an unchanged
/// repository snapshot yields an identical record.
pub fn compute_trend(
    repo_path: &Path,
    commit_hash: &str,
    merger: &dyn TextMerger,
) -> Result<TrendRecord, TrendError> {
    let history = HistoryProvider::open(repo_path)?;
    let merge = history.resolve(commit_hash)?;
    let paths = resolve_branch_paths(&history, &merge)?;
    let base = paths.base.clone();

    let steps = interleave(paths.branch1, paths.branch2);
    debug!(
        commit = %merge.short(),
        base = %base.short(),
        steps = steps.len(),
        "replaying merge"
    );

    let mut frontier1 = base.oid;
    let mut frontier2 = base.oid;
    let mut stats1 = BranchStats::default();
    let mut stats2 = BranchStats::default();

    let mut measurements = vec![baseline(&base)];

    for step in steps {
        // The frontier advances unconditionally; a failed measurement skips
        // this step's record but must not corrupt later steps.
        match step.side {
            BranchSide::Branch1 => frontier1 = step.commit.oid,
            BranchSide::Branch2 => frontier2 = step.commit.oid,
        }

        let changes = match history.commit_changes(step.commit.oid) {
            Ok(changes) => changes,
            Err(e) => {
                warn!(
                    commit = %step.commit.short(),
                    error = %e,
                    "cannot read commit changes, skipping step"
                );
                continue;
            }
        };
        match step.side {
            BranchSide::Branch1 => stats1 = stats1.advance(&changes, &step.commit.author),
            BranchSide::Branch2 => stats2 = stats2.advance(&changes, &step.commit.author),
        }

        let entries = match evaluator::evaluate(history.repo(), base.oid, frontier1, frontier2) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    commit = %step.commit.short(),
                    error = %e,
                    "virtual merge evaluation failed, skipping step"
                );
                continue;
            }
        };
        let conflict_files = entries.len();
        let counts = match analyzer::measure_conflicts(&history, &entries, merger) {
            Ok(counts) => counts,
            Err(e) => {
                warn!(
                    commit = %step.commit.short(),
                    error = %e,
                    "conflict analysis failed, skipping step"
                );
                continue;
            }
        };

        measurements.push(measurement(
            &step.commit,
            step.side,
            frontier1,
            frontier2,
            conflict_files,
            counts,
            &stats1,
            &stats2,
        ));
    }

    Ok(TrendRecord {
        commit: merge.oid.to_string(),
        steps: measurements,
    })
}

/// The zero-valued entry representing the base state itself.
fn baseline(base: &CommitRef) -> ConflictMeasurement {
    let base_hex = base.oid.to_string();
    ConflictMeasurement {
        timestamp: base.time,
        advanced: None,
        commit_branch1: base_hex.clone(),
        commit_branch2: base_hex,
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
    }
}

#[allow(clippy::too_many_arguments)]
fn measurement(
    commit: &CommitRef,
    side: BranchSide,
    frontier1: git2::Oid,
    frontier2: git2::Oid,
    conflict_files: usize,
    counts: ConflictCounts,
    stats1: &BranchStats,
    stats2: &BranchStats,
) -> ConflictMeasurement {
    ConflictMeasurement {
        timestamp: commit.time,
        advanced: Some(side),
        commit_branch1: frontier1.to_string(),
        commit_branch2: frontier2.to_string(),
        conflict_files,
        conflict_lines: counts.lines,
        conflict_hunks: counts.hunks,
        commits_branch1: stats1.commits,
        commits_branch2: stats2.commits,
        loc_branch1: stats1.loc,
        loc_branch2: stats2.loc,
        loc_merge: stats1.loc + stats2.loc,
        files_branch1: stats1.files.len(),
        files_branch2: stats2.files.len(),
        files_merge: stats1.files.union(&stats2.files).count(),
        authors_branch1: stats1.authors.len(),
        authors_branch2: stats2.authors.len(),
        authors_merge: stats1.authors.union(&stats2.authors).count(),
    }
}

// ---------------------------------------------------------------------------
// Batch driver
// ---------------------------------------------------------------------------

/// Replay many conflicted merges in parallel.
///
/// One failed replay is logged and excluded from the output; the batch never
/// aborts. Hashes present in `skip` (already-recorded commits from a prior
/// run) are not replayed, making interrupted batches resumable. Output order
/// follows the input hash order.
pub fn compute_all_trends(
    repo_path: &Path,
    hashes: &[String],
    merger: &dyn TextMerger,
    skip: &HashSet<String>,
    observer: &dyn ReplayObserver,
) -> (Vec<TrendRecord>, RunSummary) {
    info!(
        total = hashes.len(),
        skipped = skip.len().min(hashes.len()),
        "starting batch replay"
    );

    enum Outcome {
        Done(TrendRecord),
        Skipped,
        Failed(String, String),
    }

    let outcomes: Vec<Outcome> = hashes
        .par_iter()
        .map(|hash| {
            if skip.contains(hash) {
                observer.merge_skipped(hash);
                return Outcome::Skipped;
            }
            match compute_trend(repo_path, hash, merger) {
                Ok(record) => {
                    observer.merge_completed(hash, record.steps.len());
                    Outcome::Done(record)
                }
                Err(e) => {
                    warn!(commit = %hash, error = %e, "replay failed, excluding commit");
                    observer.merge_failed(hash, &e);
                    Outcome::Failed(hash.clone(), e.to_string())
                }
            }
        })
        .collect();

    let mut records = Vec::new();
    let mut summary = RunSummary::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Done(record) => {
                records.push(record);
                summary.completed += 1;
            }
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Failed(commit, error) => summary.failed.push(FailedMerge { commit, error }),
        }
    }

    info!(
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed.len(),
        "batch replay finished"
    );
    (records, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(files: &[&str], loc: u64) -> ChangeStats {
        ChangeStats {
            files: files.iter().map(|f| f.to_string()).collect(),
            loc,
        }
    }

    #[test]
    fn test_branch_stats_fold() {
        let stats = BranchStats::default()
            .advance(&changes(&["a.rs", "b.rs"], 10), "alice <a@x>")
            .advance(&changes(&["b.rs", "c.rs"], 5), "bob <b@x>")
            .advance(&changes(&["a.rs"], 1), "alice <a@x>");

        assert_eq!(stats.commits, 3);
        assert_eq!(stats.loc, 16);
        assert_eq!(stats.files.len(), 3);
        assert_eq!(stats.authors.len(), 2);
    }

    #[test]
    fn test_branch_stats_monotonic() {
        let mut stats = BranchStats::default();
        let mut prev = (0, 0, 0, 0);
        for i in 0..20u64 {
            let file = format!("f{}.rs", i % 4);
            stats = stats.advance(&changes(&[file.as_str()], i), "dev <d@x>");
            let cur = (stats.commits, stats.loc, stats.files.len(), stats.authors.len());
            assert!(cur.0 >= prev.0 && cur.1 >= prev.1 && cur.2 >= prev.2 && cur.3 >= prev.3);
            prev = cur;
        }
        assert_eq!(stats.files.len(), 4);
        assert_eq!(stats.authors.len(), 1);
    }
}
