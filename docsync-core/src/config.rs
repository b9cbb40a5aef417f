//! `~/.docsync/config.yaml` — every field optional, defaults below.
//!
//! ```yaml
//! artifact_name: CLAUDE.md
//! default_branch: main
//! templates_dir: ~/.docsync/templates
//! generator:
//!   program: claude
//!   args: ["-p"]
//!   model: sonnet
//! session:
//!   frequency: 5
//!   tools: [Edit, Write, MultiEdit, NotebookEdit, Bash, Task]
//!   max_transcript_chars: 100000
//! skip:
//!   doc_globs: ["*.md", "*.mdx", "*.rst", "docs/**"]
//!   markers: ["[skip docs]", "[docs skip]", "[no docs]"]
//!   opt_out_env: DOCSYNC_SKIP
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};
use crate::paths;

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File name that marks a directory as owning documentation.
    pub artifact_name: String,
    /// First fallback branch when the tracked commit is no longer reachable.
    pub default_branch: String,
    /// Directory of `*.tera` prompt overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    pub generator: GeneratorConfig,
    pub session: SessionConfig,
    pub skip: SkipConfig,
}

/// How the external generator is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub program: String,
    /// Arguments placed before the prompt argument.
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Session-progress trigger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of counted work actions between updates.
    pub frequency: u64,
    /// Tool names that count as work actions. Empty counts every tool.
    pub tools: Vec<String>,
    /// Upper bound on transcript text handed to the generator.
    pub max_transcript_chars: usize,
}

/// Skip-rule settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipConfig {
    pub doc_globs: Vec<String>,
    pub markers: Vec<String>,
    pub opt_out_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact_name: "CLAUDE.md".to_string(),
            default_branch: "main".to_string(),
            templates_dir: None,
            generator: GeneratorConfig::default(),
            session: SessionConfig::default(),
            skip: SkipConfig::default(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: vec!["-p".to_string()],
            model: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frequency: 5,
            tools: ["Edit", "Write", "MultiEdit", "NotebookEdit", "Bash", "Task"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_transcript_chars: 100_000,
        }
    }
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            doc_globs: ["*.md", "*.mdx", "*.rst", "docs/**"]
                .into_iter()
                .map(String::from)
                .collect(),
            markers: ["[skip docs]", "[docs skip]", "[no docs]"]
                .into_iter()
                .map(String::from)
                .collect(),
            opt_out_env: "DOCSYNC_SKIP".to_string(),
        }
    }
}

impl SessionConfig {
    /// Whether a tool invocation counts toward the update threshold.
    pub fn counts_tool(&self, tool_name: &str) -> bool {
        self.tools.is_empty() || self.tools.iter().any(|t| t == tool_name)
    }
}

/// Load `<home>/.docsync/config.yaml`, falling back to defaults when absent.
pub fn load_at(home: &Path) -> Result<Config, StoreError> {
    load_file(&paths::config_path(home))
}

/// Load a config document from an explicit path.
pub fn load_file(path: &Path) -> Result<Config, StoreError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.session.frequency, 5);
        assert_eq!(config.artifact_name, "CLAUDE.md");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let home = TempDir::new().unwrap();
        let path = paths::config_path(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "default_branch: develop\nsession:\n  frequency: 3\ngenerator:\n  model: opus\n",
        )
        .unwrap();

        let config = load_at(home.path()).unwrap();
        assert_eq!(config.default_branch, "develop");
        assert_eq!(config.session.frequency, 3);
        assert_eq!(config.session.max_transcript_chars, 100_000);
        assert_eq!(config.generator.program, "claude");
        assert_eq!(config.generator.model.as_deref(), Some("opus"));
    }

    #[test]
    fn malformed_file_reports_path() {
        let home = TempDir::new().unwrap();
        let path = paths::config_path(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "session: [not, a, mapping").unwrap();

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, StoreError::Config { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn empty_tool_list_counts_everything() {
        let session = SessionConfig {
            tools: vec![],
            ..SessionConfig::default()
        };
        assert!(session.counts_tool("Read"));
        assert!(SessionConfig::default().counts_tool("Edit"));
        assert!(!SessionConfig::default().counts_tool("Read"));
    }
}
