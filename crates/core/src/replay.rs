//! Interleaved replay ordering.
//!
//! Merges the two tip-first branch paths into a single sequence of replay
//! steps by repeatedly taking the chronologically earliest remaining commit
//! across both branches, exactly the merge phase of a merge sort. When one
//! branch runs out, the remainder of the other drains in its existing order.
//! No step is ever skipped or coalesced.
//!
//! Tie-break: branch 1 advances only when its next commit is strictly
//! earlier; on equal timestamps branch 2 advances. The rule is stable and
//! matters only for exact second-granularity ties.

use crate::history::CommitRef;
use crate::models::BranchSide;

/// One event in the interleaved replay: the named branch's frontier advances
/// to `commit`.
#[derive(Debug, Clone)]
pub struct MergeStep {
    pub side: BranchSide,
    pub commit: CommitRef,
}

/// Interleave the two tip-first branch paths into a time-ordered step list.
///
/// The result length is always `branch1.len() + branch2.len()`.
pub fn interleave(branch1: Vec<CommitRef>, branch2: Vec<CommitRef>) -> Vec<MergeStep> {
    // Tip-first order means the oldest commit sits at the back of each list;
    // treat both as stacks and pop the older top.
    let mut first = branch1;
    let mut second = branch2;
    let mut steps = Vec::with_capacity(first.len() + second.len());

    loop {
        let take_first = match (first.last(), second.last()) {
            (Some(next1), Some(next2)) => next1.time < next2.time,
            _ => break,
        };
        let (source, side) = if take_first {
            (&mut first, BranchSide::Branch1)
        } else {
            (&mut second, BranchSide::Branch2)
        };
        if let Some(commit) = source.pop() {
            steps.push(MergeStep { side, commit });
        }
    }

    while let Some(commit) = first.pop() {
        steps.push(MergeStep {
            side: BranchSide::Branch1,
            commit,
        });
    }
    while let Some(commit) = second.pop() {
        steps.push(MergeStep {
            side: BranchSide::Branch2,
            commit,
        });
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use git2::Oid;

    fn commit(id: u8, secs: i64) -> CommitRef {
        let hex: String = format!("{:02x}", id).repeat(20);
        CommitRef {
            oid: Oid::from_str(&hex).unwrap(),
            time: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
            author: format!("dev{} <dev{}@example.com>", id, id),
            parents: Vec::new(),
        }
    }

    #[test]
    fn test_interleave_orders_by_time() {
        // branch1 commits at t=10, t=30; branch2 at t=20, t=40.
        let b1 = vec![commit(3, 30), commit(1, 10)];
        let b2 = vec![commit(4, 40), commit(2, 20)];

        let steps = interleave(b1, b2);
        assert_eq!(steps.len(), 4);
        let times: Vec<i64> = steps.iter().map(|s| s.commit.time.timestamp()).collect();
        assert_eq!(times, vec![10, 20, 30, 40]);
        let sides: Vec<BranchSide> = steps.iter().map(|s| s.side).collect();
        assert_eq!(
            sides,
            vec![
                BranchSide::Branch1,
                BranchSide::Branch2,
                BranchSide::Branch1,
                BranchSide::Branch2
            ]
        );
    }

    #[test]
    fn test_interleave_tie_prefers_branch2() {
        let b1 = vec![commit(1, 100)];
        let b2 = vec![commit(2, 100)];
        let steps = interleave(b1, b2);
        assert_eq!(steps[0].side, BranchSide::Branch2);
        assert_eq!(steps[1].side, BranchSide::Branch1);
    }

    #[test]
    fn test_interleave_drains_remainder_in_order() {
        let b1 = vec![commit(5, 500), commit(4, 400), commit(1, 10)];
        let b2 = vec![commit(2, 20)];
        let steps = interleave(b1, b2);
        assert_eq!(steps.len(), 4);
        let times: Vec<i64> = steps.iter().map(|s| s.commit.time.timestamp()).collect();
        assert_eq!(times, vec![10, 20, 400, 500]);
    }

    #[test]
    fn test_interleave_empty_branch() {
        let b1 = vec![commit(2, 20), commit(1, 10)];
        let steps = interleave(b1, Vec::new());
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.side == BranchSide::Branch1));
        assert!(steps[0].commit.time <= steps[1].commit.time);
    }

    #[test]
    fn test_interleave_both_empty() {
        assert!(interleave(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_interleave_timestamps_non_decreasing() {
        let b1 = vec![commit(7, 70), commit(5, 50), commit(3, 30)];
        let b2 = vec![commit(6, 60), commit(4, 30), commit(2, 10)];
        let steps = interleave(b1, b2);
        assert_eq!(steps.len(), 6);
        for pair in steps.windows(2) {
            assert!(pair[0].commit.time <= pair[1].commit.time);
        }
    }
}
