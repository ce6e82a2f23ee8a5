//! In-memory three-way tree merge.
//!
//! Builds a virtual merge index between `(base, ours, theirs)` via
//! `git2::Repository::merge_trees`, without creating or modifying any
//! working-tree or on-disk index state. Per path the merge classifies:
//! unchanged, changed on one side only, changed identically on both sides
//! (all auto-resolved), and changed differently on both sides -- which lands
//! in the index as a conflict entry carrying up to three content stages.

use git2::{MergeOptions, Oid, Repository};
use tracing::{debug, trace};

use crate::errors::MergeError;

/// A path left conflicted by the virtual merge, with all three stages.
///
/// Entries that are missing a stage (add/add without a base, edit/delete) are
/// not genuinely three-way conflicted and are excluded from measurement; only
/// full base/ours/theirs entries are produced.
#[derive(Debug, Clone)]
pub struct ConflictEntry {
    pub path: String,
    pub base: Oid,
    pub ours: Oid,
    pub theirs: Oid,
}

fn merge_index(
    repo: &Repository,
    base: Oid,
    ours: Oid,
    theirs: Oid,
) -> Result<git2::Index, MergeError> {
    let to_tree = |oid: Oid| {
        repo.find_commit(oid)
            .and_then(|c| c.tree())
            .map_err(|e| MergeError::EvaluationFailed {
                base: base.to_string(),
                detail: format!("cannot read tree of {}: {}", oid, e),
            })
    };

    let base_tree = to_tree(base)?;
    let our_tree = to_tree(ours)?;
    let their_tree = to_tree(theirs)?;

    let mut opts = MergeOptions::new();
    opts.fail_on_conflict(false);
    repo.merge_trees(&base_tree, &our_tree, &their_tree, Some(&opts))
        .map_err(|e| MergeError::EvaluationFailed {
            base: base.to_string(),
            detail: e.to_string(),
        })
}

/// Compute the virtual merge and return the genuinely conflicted paths.
pub fn evaluate(
    repo: &Repository,
    base: Oid,
    ours: Oid,
    theirs: Oid,
) -> Result<Vec<ConflictEntry>, MergeError> {
    let index = merge_index(repo, base, ours, theirs)?;

    let mut entries = Vec::new();
    if !index.has_conflicts() {
        return Ok(entries);
    }

    let conflicts = index.conflicts().map_err(|e| MergeError::EvaluationFailed {
        base: base.to_string(),
        detail: e.to_string(),
    })?;
    for conflict in conflicts {
        let conflict = conflict.map_err(|e| MergeError::EvaluationFailed {
            base: base.to_string(),
            detail: e.to_string(),
        })?;
        let (Some(ancestor), Some(our), Some(their)) =
            (conflict.ancestor, conflict.our, conflict.their)
        else {
            // Fewer than three stages: not a content-vs-content conflict.
            trace!("skipping conflict entry with missing stage");
            continue;
        };
        let path = String::from_utf8_lossy(&our.path).into_owned();
        entries.push(ConflictEntry {
            path,
            base: ancestor.id,
            ours: our.id,
            theirs: their.id,
        });
    }

    debug!(
        base = %base,
        ours = %ours,
        theirs = %theirs,
        conflicted = entries.len(),
        "virtual merge evaluated"
    );
    Ok(entries)
}

/// Cheap check used by the history scan: does the virtual merge leave any
/// conflict entries at all (including partial-stage ones)?
pub fn has_conflicts(
    repo: &Repository,
    base: Oid,
    ours: Oid,
    theirs: Oid,
) -> Result<bool, MergeError> {
    let index = merge_index(repo, base, ours, theirs)?;
    Ok(index.has_conflicts())
}
