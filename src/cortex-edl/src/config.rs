//! Run configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for a script run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// If true, compute everything but don't write any files.
    pub dry_run: bool,
    /// Maximum characters of matched text shown in each trace snippet.
    pub snippet_width: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            snippet_width: 60,
        }
    }
}

impl RunOptions {
    /// Create options for dry-run mode.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Default::default()
        }
    }

    pub fn with_snippet_width(mut self, width: usize) -> Self {
        self.snippet_width = width;
        self
    }

    /// Parse options from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Invalid EDL run configuration")
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = RunOptions::default();
        assert!(!opts.dry_run);
        assert_eq!(opts.snippet_width, 60);
    }

    #[test]
    fn test_from_toml_partial() {
        let opts = RunOptions::from_toml_str("dry_run = true").unwrap();
        assert!(opts.dry_run);
        assert_eq!(opts.snippet_width, 60);

        let opts = RunOptions::from_toml_str("snippet_width = 20\n").unwrap();
        assert_eq!(opts, RunOptions::default().with_snippet_width(20));
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        assert!(RunOptions::from_toml_str("dry_run = \"yes\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("edl.toml");
        std::fs::write(&path, "dry_run = true\nsnippet_width = 10\n").unwrap();
        let opts = RunOptions::load(&path).unwrap();
        assert!(opts.dry_run);
        assert_eq!(opts.snippet_width, 10);

        assert!(RunOptions::load(&temp.path().join("missing.toml")).is_err());
    }
}
