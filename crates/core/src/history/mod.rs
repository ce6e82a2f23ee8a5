//! Read-only access to a git history via `git2`.
//!
//! [`HistoryProvider`] wraps a `git2::Repository` and exposes the narrow
//! contract the replay engine needs: commit metadata, merge bases, per-commit
//! diff stats, blob content, and a scan for historical conflicted merges.
//!
//! Nothing here mutates the repository. All merges downstream are computed
//! against in-memory tree objects, never a checked-out working directory, so
//! many providers can read the same repository concurrently.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{DiffOptions, Oid, Repository, Sort};
use tracing::{debug, info, warn};

use crate::errors::HistoryError;
use crate::merge::evaluator;
use crate::models::ConflictedMerge;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Immutable metadata for one commit, read once from history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub oid: Oid,
    /// Commit time normalized to UTC.
    pub time: DateTime<Utc>,
    /// Author identity as `Name <email>`.
    pub author: String,
    pub parents: Vec<Oid>,
}

impl CommitRef {
    /// Abbreviated hash for log output.
    pub fn short(&self) -> String {
        let hex = self.oid.to_string();
        hex[..hex.len().min(8)].to_string()
    }
}

/// File-level change metrics for a single commit against its first parent.
#[derive(Debug, Clone, Default)]
pub struct ChangeStats {
    /// Distinct paths touched (old and new sides of each delta).
    pub files: HashSet<String>,
    /// Added plus deleted line count.
    pub loc: u64,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Read-only history provider over a local git repository.
pub struct HistoryProvider {
    repo: Repository,
    repo_path: PathBuf,
}

impl HistoryProvider {
    /// Open an existing git repository at `repo_path`.
    pub fn open<P: AsRef<Path>>(repo_path: P) -> Result<Self, HistoryError> {
        let path = repo_path.as_ref();
        debug!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| HistoryError::RepositoryNotFound(path.display().to_string()))?;
        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Resolve a commit-ish string (hash, abbreviated hash, ref) to a commit.
    pub fn resolve(&self, spec: &str) -> Result<CommitRef, HistoryError> {
        let object = self
            .repo
            .revparse_single(spec)
            .map_err(|_| HistoryError::CommitNotFound(spec.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| HistoryError::CommitNotFound(spec.to_string()))?;
        Ok(Self::commit_ref_of(&commit))
    }

    /// Read commit metadata by oid.
    pub fn commit_ref(&self, oid: Oid) -> Result<CommitRef, HistoryError> {
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|_| HistoryError::ObjectNotFound(oid.to_string()))?;
        Ok(Self::commit_ref_of(&commit))
    }

    fn commit_ref_of(commit: &git2::Commit<'_>) -> CommitRef {
        let author = commit.author();
        let identity = format!(
            "{} <{}>",
            author.name().unwrap_or("unknown"),
            author.email().unwrap_or("")
        );
        let seconds = commit.time().seconds();
        let time = match DateTime::from_timestamp(seconds, 0) {
            Some(time) => time,
            None => {
                // Corrupt or absurd committer timestamp. Clamp to the epoch
                // so the replay stays deterministic, but say so.
                warn!(commit = %commit.id(), seconds, "commit time out of range, clamping to epoch");
                DateTime::<Utc>::UNIX_EPOCH
            }
        };
        CommitRef {
            oid: commit.id(),
            time,
            author: identity,
            parents: commit.parent_ids().collect(),
        }
    }

    /// Nearest common ancestor of two commits.
    ///
    /// Fails with [`HistoryError::NoCommonAncestor`] when the histories are
    /// disjoint (e.g. unrelated root commits).
    pub fn merge_base(&self, one: Oid, two: Oid) -> Result<Oid, HistoryError> {
        self.repo.merge_base(one, two).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                HistoryError::NoCommonAncestor {
                    parent1: one.to_string(),
                    parent2: two.to_string(),
                }
            } else {
                HistoryError::Git2Error(e)
            }
        })
    }

    /// Diff stats for one commit against its first parent.
    ///
    /// Root commits are diffed against the empty tree. Counts every touched
    /// path (old and new names) and added+deleted lines.
    pub fn commit_changes(&self, oid: Oid) -> Result<ChangeStats, HistoryError> {
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|_| HistoryError::ObjectNotFound(oid.to_string()))?;
        let tree = commit.tree()?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };

        let mut opts = DiffOptions::new();
        opts.ignore_filemode(true);
        let diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        let mut files = HashSet::new();
        for delta in diff.deltas() {
            if let Some(path) = delta.old_file().path() {
                files.insert(path.to_string_lossy().into_owned());
            }
            if let Some(path) = delta.new_file().path() {
                files.insert(path.to_string_lossy().into_owned());
            }
        }
        let stats = diff.stats()?;
        let loc = (stats.insertions() + stats.deletions()) as u64;

        Ok(ChangeStats { files, loc })
    }

    /// Read a blob as text by its content-addressed id.
    ///
    /// Non-UTF-8 content is converted lossily; the line-level merge operates
    /// on the textual rendering either way.
    pub fn blob_text(&self, oid: Oid) -> Result<String, HistoryError> {
        let blob = self
            .repo
            .find_blob(oid)
            .map_err(|_| HistoryError::ObjectNotFound(oid.to_string()))?;
        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }

    /// Walk all commits reachable from HEAD and return every two-parent
    /// merge whose virtual re-merge leaves conflicts.
    ///
    /// Commits whose parents share no merge base are skipped, matching the
    /// treatment of grafted or partially-cloned histories.
    pub fn scan_conflicted_merges(&self) -> Result<Vec<ConflictedMerge>, HistoryError> {
        info!(path = %self.repo_path.display(), "scanning history for conflicted merges");

        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;

        let mut found = Vec::new();
        let mut merges = 0usize;
        for oid in revwalk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            if commit.parent_count() != 2 {
                continue;
            }
            merges += 1;

            let p1 = commit.parent_id(0)?;
            let p2 = commit.parent_id(1)?;
            let base = match self.merge_base(p1, p2) {
                Ok(base) => base,
                Err(HistoryError::NoCommonAncestor { .. }) => continue,
                Err(e) => return Err(e),
            };

            match evaluator::has_conflicts(&self.repo, base, p1, p2) {
                Ok(true) => {
                    debug!(commit = %oid, "conflicted merge found");
                    found.push(ConflictedMerge {
                        commit: oid.to_string(),
                        summary: commit.summary().unwrap_or("").to_string(),
                    });
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(commit = %oid, error = %e, "skipping merge: evaluation failed");
                }
            }
        }

        info!(
            merges,
            conflicted = found.len(),
            "history scan complete"
        );
        Ok(found)
    }
}
