//! TOML-based run configuration for MergeTrend.
//!
//! A config file is optional; every field has a default and the CLI can
//! override each one per invocation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;

/// Which three-way text merge backend to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeToolKind {
    /// External `git merge-file -p` (reference semantics).
    Git,
    /// In-process diffy merge (no process spawns).
    Diffy,
}

impl std::fmt::Display for MergeToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Diffy => write!(f, "diffy"),
        }
    }
}

impl std::str::FromStr for MergeToolKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "diffy" => Ok(Self::Diffy),
            other => Err(ConfigError::InvalidValue {
                field: "merge_tool".into(),
                detail: format!("unknown merge tool '{}', expected 'git' or 'diffy'", other),
            }),
        }
    }
}

/// Run configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path of the repository to mine.
    #[serde(default = "default_repository")]
    pub repository: PathBuf,

    /// Output path for the trend record collection.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Worker threads for the batch replay; 0 means one per core.
    #[serde(default)]
    pub jobs: usize,

    /// Text merge backend.
    #[serde(default = "default_merge_tool")]
    pub merge_tool: MergeToolKind,

    /// Skip commits already present in the output file.
    #[serde(default = "default_resume")]
    pub resume: bool,
}

fn default_repository() -> PathBuf {
    PathBuf::from(".")
}
fn default_output() -> PathBuf {
    PathBuf::from("trends.json")
}
fn default_merge_tool() -> MergeToolKind {
    MergeToolKind::Git
}
fn default_resume() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            output: default_output(),
            jobs: 0,
            merge_tool: default_merge_tool(),
            resume: default_resume(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!(path = %path.display(), "configuration loaded");
        config.validate()?;
        Ok(config)
    }

    /// Validate field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repository".into(),
                detail: "must not be empty".into(),
            });
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output".into(),
                detail: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.merge_tool, MergeToolKind::Git);
        assert_eq!(config.jobs, 0);
        assert!(config.resume);
    }

    #[test]
    fn test_parse_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergetrend.toml");
        std::fs::write(
            &path,
            r#"
repository = "/srv/cases/rails"
output = "trends/rails.json"
jobs = 4
merge_tool = "diffy"
resume = false
"#,
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.repository, PathBuf::from("/srv/cases/rails"));
        assert_eq!(config.jobs, 4);
        assert_eq!(config.merge_tool, MergeToolKind::Diffy);
        assert!(!config.resume);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergetrend.toml");
        std::fs::write(&path, "repository = \"/srv/repo\"\n").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.output, PathBuf::from("trends.json"));
        assert_eq!(config.merge_tool, MergeToolKind::Git);
    }

    #[test]
    fn test_missing_file() {
        let err = RunConfig::load("/nonexistent/mergetrend.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_merge_tool_from_str() {
        assert_eq!("git".parse::<MergeToolKind>().unwrap(), MergeToolKind::Git);
        assert_eq!(
            "diffy".parse::<MergeToolKind>().unwrap(),
            MergeToolKind::Diffy
        );
        assert!("ed".parse::<MergeToolKind>().is_err());
    }
}
