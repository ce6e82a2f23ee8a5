//! Conflict content analysis.
//!
//! For each path left conflicted by the tree-level merge, fetches the three
//! stage blobs, runs the line-level three-way merge, and scans the output for
//! marker-delimited conflict regions.
//!
//! A path that conflicts at the tree level can still textually auto-resolve;
//! it then contributes zero lines and hunks while remaining counted as a
//! conflicted file upstream.

use tracing::{trace, warn};

use crate::errors::MergeError;
use crate::history::HistoryProvider;
use crate::merge::evaluator::ConflictEntry;
use crate::merge::text::TextMerger;

/// Region start marker, as emitted by every diff3-style merge tool.
const MARKER_START: &str = "<<<<<<<";
/// Region end marker. The middle `=======` / `|||||||` delimiters fall
/// inside the counted region and are not tracked separately.
const MARKER_END: &str = ">>>>>>>";

/// Aggregated line/hunk counts across all conflicted paths of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictCounts {
    pub lines: usize,
    pub hunks: usize,
}

/// Count conflicted lines and hunks in merged output.
///
/// A region spans from its `<<<<<<<` line to its `>>>>>>>` line inclusive of
/// both markers; the hunk count increments once per start marker.
pub fn scan_conflict_markers(merged: &str) -> ConflictCounts {
    let mut counts = ConflictCounts::default();
    let mut start = 0usize;

    for (index, line) in merged.lines().enumerate() {
        if line.starts_with(MARKER_START) {
            counts.hunks += 1;
            start = index;
        } else if line.starts_with(MARKER_END) {
            counts.lines += index - start + 1;
        }
    }
    counts
}

/// Measure line/hunk conflict volume across all conflicted paths.
///
/// An abnormal text-merge failure on one path is logged and treated as zero
/// conflict output for that path rather than failing the step; this mirrors
/// the tolerant handling of malformed inputs and can undercount, so the
/// warning carries the path.
pub fn measure_conflicts(
    history: &HistoryProvider,
    entries: &[ConflictEntry],
    merger: &dyn TextMerger,
) -> Result<ConflictCounts, MergeError> {
    let mut total = ConflictCounts::default();

    for entry in entries {
        let read = |oid| {
            history
                .blob_text(oid)
                .map_err(|e| MergeError::StageBlobMissing {
                    path: entry.path.clone(),
                    detail: e.to_string(),
                })
        };
        let base = read(entry.base)?;
        let ours = read(entry.ours)?;
        let theirs = read(entry.theirs)?;

        let merged = match merger.merge(&base, &ours, &theirs) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(
                    path = %entry.path,
                    tool = merger.name(),
                    error = %e,
                    "text merge failed abnormally, counting zero conflicts for path"
                );
                continue;
            }
        };

        let counts = scan_conflict_markers(&merged.text);
        trace!(
            path = %entry.path,
            lines = counts.lines,
            hunks = counts.hunks,
            "path analyzed"
        );
        total.lines += counts.lines;
        total.hunks += counts.hunks;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_no_markers() {
        let counts = scan_conflict_markers("a\nb\nc\n");
        assert_eq!(counts, ConflictCounts::default());
    }

    #[test]
    fn test_scan_single_region() {
        let merged = "\
a
<<<<<<< ours
B
=======
C
>>>>>>> theirs
z
";
        let counts = scan_conflict_markers(merged);
        assert_eq!(counts.hunks, 1);
        // Lines 1..=5 inclusive of both markers.
        assert_eq!(counts.lines, 5);
    }

    #[test]
    fn test_scan_region_with_base_delimiter() {
        let merged = "\
<<<<<<< ours
B
||||||| base
b
=======
C
>>>>>>> theirs
";
        let counts = scan_conflict_markers(merged);
        assert_eq!(counts.hunks, 1);
        assert_eq!(counts.lines, 7);
    }

    #[test]
    fn test_scan_multiple_regions() {
        let merged = "\
keep
<<<<<<< ours
X
=======
Y
>>>>>>> theirs
mid
<<<<<<< ours
P
Q
=======
R
>>>>>>> theirs
end
";
        let counts = scan_conflict_markers(merged);
        assert_eq!(counts.hunks, 2);
        assert_eq!(counts.lines, 5 + 6);
    }

    #[test]
    fn test_scan_markers_mid_line_not_counted() {
        // Markers only count at line start.
        let merged = "x <<<<<<< y\nz >>>>>>> w\n";
        let counts = scan_conflict_markers(merged);
        assert_eq!(counts, ConflictCounts::default());
    }
}
