//! Virtual merging and conflict measurement.
//!
//! The merge subsystem is responsible for:
//! 1. **Evaluation** -- computing an in-memory three-way tree merge and
//!    extracting the paths left conflicted.
//! 2. **Text merging** -- the line-level three-way merge primitive, as a
//!    capability trait with external-tool and in-process implementations.
//! 3. **Analysis** -- scanning merged output for conflict-marker regions and
//!    counting conflicted lines and hunks.

pub mod analyzer;
pub mod evaluator;
pub mod text;

pub use analyzer::{measure_conflicts, ConflictCounts};
pub use evaluator::ConflictEntry;
pub use text::{DiffyMerger, GitMergeFile, MergedText, TextMerger};
