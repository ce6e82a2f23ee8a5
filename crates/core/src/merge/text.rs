//! Line-level three-way text merge primitives.
//!
//! [`TextMerger`] is the capability seam for the diff3-style merge: align
//! both modified versions against the common base, emit non-overlapping edits
//! directly, and delimit genuinely overlapping edits with standard
//! `<<<<<<<` / `=======` / `>>>>>>>` markers.
//!
//! Two implementations: [`GitMergeFile`] shells out to `git merge-file -p`
//! (the reference semantics), and [`DiffyMerger`] runs the in-process `diffy`
//! merge, which avoids process-spawn overhead in tests and tight loops.
//!
//! Producing conflicts is a normal outcome for both, never an error.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::errors::TextMergeError;

/// Output of a three-way text merge.
#[derive(Debug, Clone)]
pub struct MergedText {
    /// Merged content; contains marker regions when `clean` is false.
    pub text: String,
    /// Whether the merge completed without conflicts.
    pub clean: bool,
}

/// Capability interface for the three-way text merge primitive.
pub trait TextMerger: Send + Sync {
    /// Merge `ours` and `theirs` against `base`.
    ///
    /// Must return output even when the merge conflicts; errors are reserved
    /// for abnormal termination (malformed invocation, spawn failure).
    fn merge(&self, base: &str, ours: &str, theirs: &str) -> Result<MergedText, TextMergeError>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// External `git merge-file`
// ---------------------------------------------------------------------------

/// Three-way merge backed by the external `git merge-file -p` tool.
///
/// The three versions are written to a temporary directory and merged to
/// stdout. `git merge-file` exits with the number of conflicts (0 when
/// clean), so small positive exit codes are expected; only a negative /
/// signal exit is abnormal. Spawn failures are retried once.
pub struct GitMergeFile;

const GIT_MERGE_FILE: &str = "git merge-file";

impl GitMergeFile {
    fn run(&self, base: &str, ours: &str, theirs: &str) -> Result<MergedText, TextMergeError> {
        let dir = tempfile::tempdir()?;
        let base_path = dir.path().join("base");
        let ours_path = dir.path().join("ours");
        let theirs_path = dir.path().join("theirs");

        std::fs::File::create(&base_path)?.write_all(base.as_bytes())?;
        std::fs::File::create(&ours_path)?.write_all(ours.as_bytes())?;
        std::fs::File::create(&theirs_path)?.write_all(theirs.as_bytes())?;

        let output = Command::new("git")
            .arg("merge-file")
            .arg("-p")
            .arg(&ours_path)
            .arg(&base_path)
            .arg(&theirs_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TextMergeError::SpawnFailed {
                tool: GIT_MERGE_FILE.into(),
                detail: e.to_string(),
            })?;

        match output.status.code() {
            // Exit code is the conflict count; 0 means a clean merge.
            Some(code) if (0..=127).contains(&code) => Ok(MergedText {
                text: String::from_utf8_lossy(&output.stdout).into_owned(),
                clean: code == 0,
            }),
            Some(code) => Err(TextMergeError::AbnormalExit {
                tool: GIT_MERGE_FILE.into(),
                detail: format!(
                    "exit code {}: {}",
                    code,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }),
            None => Err(TextMergeError::AbnormalExit {
                tool: GIT_MERGE_FILE.into(),
                detail: "terminated by signal".into(),
            }),
        }
    }
}

impl TextMerger for GitMergeFile {
    fn merge(&self, base: &str, ours: &str, theirs: &str) -> Result<MergedText, TextMergeError> {
        match self.run(base, ours, theirs) {
            // Transient spawn failures get exactly one retry.
            Err(TextMergeError::SpawnFailed { detail, .. }) => {
                debug!(detail, "merge tool spawn failed, retrying once");
                self.run(base, ours, theirs)
            }
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        GIT_MERGE_FILE
    }
}

// ---------------------------------------------------------------------------
// In-process diffy merge
// ---------------------------------------------------------------------------

/// Three-way merge backed by the in-process `diffy` implementation.
///
/// Configured for plain merge-style markers so its conflict regions render
/// exactly like `git merge-file -p` output. diffy's default is diff3 style,
/// whose extra `|||||||` base section would inflate line counts relative to
/// the external tool.
pub struct DiffyMerger;

impl TextMerger for DiffyMerger {
    fn merge(&self, base: &str, ours: &str, theirs: &str) -> Result<MergedText, TextMergeError> {
        let mut opts = diffy::MergeOptions::new();
        opts.set_conflict_style(diffy::ConflictStyle::Merge);
        match opts.merge(base, ours, theirs) {
            Ok(text) => Ok(MergedText { text, clean: true }),
            // diffy reports conflicts as Err but still yields marked output.
            Err(text) => Ok(MergedText { text, clean: false }),
        }
    }

    fn name(&self) -> &'static str {
        "diffy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diffy_clean_merge_one_side_changed() {
        let base = "line1\nline2\nline3\n";
        let ours = "line1\nmodified\nline3\n";
        let result = DiffyMerger.merge(base, ours, base).unwrap();
        assert!(result.clean);
        assert!(result.text.contains("modified"));
        assert!(!result.text.contains("<<<<<<<"));
    }

    #[test]
    fn test_diffy_clean_merge_disjoint_changes() {
        let base = "aaa\nbbb\nccc\nddd\neee\n";
        let ours = "AAA\nbbb\nccc\nddd\neee\n";
        let theirs = "aaa\nbbb\nccc\nddd\nEEE\n";
        let result = DiffyMerger.merge(base, ours, theirs).unwrap();
        assert!(result.clean);
        assert!(result.text.contains("AAA"));
        assert!(result.text.contains("EEE"));
    }

    #[test]
    fn test_diffy_conflicting_changes_produce_markers() {
        let base = "line1\noriginal\nline3\n";
        let ours = "line1\nours_version\nline3\n";
        let theirs = "line1\ntheirs_version\nline3\n";
        let result = DiffyMerger.merge(base, ours, theirs).unwrap();
        assert!(!result.clean);
        assert!(result.text.contains("<<<<<<<"));
        assert!(result.text.contains("======="));
        assert!(result.text.contains(">>>>>>>"));
    }

    #[test]
    fn test_diffy_emits_plain_merge_markers_without_base_section() {
        let base = "a\nb\n";
        let ours = "a\nB\n";
        let theirs = "a\nC\n";
        let result = DiffyMerger.merge(base, ours, theirs).unwrap();
        assert!(!result.clean);
        assert!(!result.text.contains("|||||||"));
        // Context line plus a five-line conflict region, same rendering as
        // `git merge-file -p`.
        assert_eq!(result.text.lines().count(), 6);
    }

    #[test]
    fn test_git_merge_file_matches_diffy_on_conflict() {
        // Requires git on PATH, which the test environment provides.
        let base = "a\nb\n";
        let ours = "a\nB\n";
        let theirs = "a\nC\n";
        let result = GitMergeFile.merge(base, ours, theirs).unwrap();
        assert!(!result.clean);
        assert!(result.text.contains("<<<<<<<"));
        assert!(result.text.contains(">>>>>>>"));

        let clean = GitMergeFile.merge(base, ours, base).unwrap();
        assert!(clean.clean);
        assert_eq!(clean.text, ours);
    }
}
