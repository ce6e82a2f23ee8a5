//! MergeTrend core library.
//!
//! Mines a git history for conflicted merge commits and, for each one,
//! replays the merge incrementally from the merge base: both divergent
//! commit sequences are interleaved by commit time, and after every step an
//! in-memory three-way merge is recomputed and its conflict volume measured
//! (files, lines, hunks). The result is a time series per conflicted merge,
//! suitable for trend analysis.
//!
//! The library never writes to a working tree or on-disk index; all merges
//! are evaluated against tree objects only, so replays may run concurrently
//! against the same repository.

pub mod config;
pub mod errors;
pub mod history;
pub mod merge;
pub mod models;
pub mod replay;
pub mod resolver;
pub mod sink;
pub mod trend;

// Re-exports for convenience.
pub use config::{MergeToolKind, RunConfig};
pub use errors::TrendError;
pub use history::HistoryProvider;
pub use merge::{DiffyMerger, GitMergeFile, TextMerger};
pub use models::{ConflictMeasurement, ConflictedMerge, RunSummary, TrendRecord};
pub use sink::{JsonFileSink, TrendSink};
pub use trend::{compute_all_trends, compute_trend, NullObserver, ReplayObserver};
