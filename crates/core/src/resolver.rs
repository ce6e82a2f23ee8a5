//! Ancestor discovery and dual-branch path reconstruction.
//!
//! Given a two-parent merge commit, finds the merge base and reconstructs,
//! for each parent, the commit sequence leading back to that base. The
//! traversal is a depth-first walk of the parent-link graph with a visited
//! set, which guarantees termination on merge-heavy histories where the
//! graph is a DAG rather than a tree.
//!
//! Non-guarantee: when multiple paths to the base exist, the *first
//! discovered* path is returned, which is neither the shortest nor the
//! first-parent path. Parents are pushed in order, so the last parent of
//! each commit is explored first.

use git2::Oid;
use tracing::debug;

use crate::errors::HistoryError;
use crate::history::{CommitRef, HistoryProvider};

/// The merge base and both branch paths for one conflicted merge.
#[derive(Debug, Clone)]
pub struct BranchPaths {
    pub base: CommitRef,
    /// Commits strictly between the base and the first parent, inclusive of
    /// the parent, ordered tip-first (nearest the parent comes first).
    pub branch1: Vec<CommitRef>,
    /// Same for the second parent.
    pub branch2: Vec<CommitRef>,
}

/// Resolve the merge base of `merge`'s parents and both branch paths.
pub fn resolve_branch_paths(
    history: &HistoryProvider,
    merge: &CommitRef,
) -> Result<BranchPaths, HistoryError> {
    if merge.parents.len() != 2 {
        return Err(HistoryError::NotAMergeCommit {
            sha: merge.oid.to_string(),
            parents: merge.parents.len(),
        });
    }
    let p1 = merge.parents[0];
    let p2 = merge.parents[1];

    let base_oid = history.merge_base(p1, p2)?;
    let base = history.commit_ref(base_oid)?;

    let branch1 = branch_path(history, p1, base_oid)?;
    let branch2 = branch_path(history, p2, base_oid)?;
    debug!(
        merge = %merge.short(),
        base = %base.short(),
        len1 = branch1.len(),
        len2 = branch2.len(),
        "branch paths resolved"
    );

    Ok(BranchPaths {
        base,
        branch1,
        branch2,
    })
}

/// First-discovered path from `from` back to `base`, tip-first, with the
/// base itself dropped from the result.
fn branch_path(
    history: &HistoryProvider,
    from: Oid,
    base: Oid,
) -> Result<Vec<CommitRef>, HistoryError> {
    let mut stack: Vec<(Oid, Vec<Oid>)> = vec![(from, vec![from])];
    let mut visited = std::collections::HashSet::new();

    while let Some((current, path)) = stack.pop() {
        if current == base {
            // Drop the trailing base: the path is strictly between base and
            // the parent, inclusive of the parent only.
            return path[..path.len() - 1]
                .iter()
                .map(|&oid| history.commit_ref(oid))
                .collect();
        }

        if visited.insert(current) {
            let commit = history.commit_ref(current)?;
            for parent in commit.parents {
                if !visited.contains(&parent) {
                    let mut next = path.clone();
                    next.push(parent);
                    stack.push((parent, next));
                }
            }
        }
    }

    Err(HistoryError::PathNotFound {
        from: from.to_string(),
        base: base.to_string(),
    })
}
