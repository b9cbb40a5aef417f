//! Skip-rule evaluation.
//!
//! Rules are checked in order and the first match wins:
//!
//! 1. the opt-out environment flag is set;
//! 2. the commit message carries a skip marker (case-insensitive);
//! 3. every changed path is documentation-only.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use docsync_core::config::SkipConfig;

/// Environment facts relevant to skipping, read once at the process boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipEnvironment {
    pub opt_out: bool,
}

impl SkipEnvironment {
    /// Reads the configured opt-out variable. Any non-empty value other than
    /// `0` or `false` opts out.
    pub fn from_env(config: &SkipConfig) -> Self {
        let opt_out = std::env::var(&config.opt_out_env)
            .map(|v| {
                let v = v.trim();
                !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
            })
            .unwrap_or(false);
        Self { opt_out }
    }
}

/// Compiled skip rules.
#[derive(Debug, Clone)]
pub struct SkipRules {
    doc_globs: Vec<Pattern>,
    markers: Vec<String>,
    opt_out_env: String,
}

impl SkipRules {
    /// Compile `config`. Invalid glob patterns are logged and ignored.
    pub fn from_config(config: &SkipConfig) -> Self {
        let doc_globs = config
            .doc_globs
            .iter()
            .filter_map(|g| match Pattern::new(g) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(pattern = %g, error = %e, "ignoring invalid doc glob");
                    None
                }
            })
            .collect();
        Self {
            doc_globs,
            markers: config.markers.iter().map(|m| m.to_lowercase()).collect(),
            opt_out_env: config.opt_out_env.clone(),
        }
    }

    /// Whether `path` (relative to the scope root) is documentation-only.
    pub fn is_doc_path(&self, path: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let rel = path.to_string_lossy().replace('\\', "/");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.doc_globs
            .iter()
            .any(|p| p.matches_with(&rel, options) || p.matches_with(&name, options))
    }
}

impl Default for SkipRules {
    fn default() -> Self {
        Self::from_config(&SkipConfig::default())
    }
}

/// Result of rule evaluation; `reason` is empty when not skipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipDecision {
    pub skip: bool,
    pub reason: String,
}

impl SkipDecision {
    fn proceed() -> Self {
        Self {
            skip: false,
            reason: String::new(),
        }
    }

    fn skip(reason: impl Into<String>) -> Self {
        Self {
            skip: true,
            reason: reason.into(),
        }
    }
}

/// Decide whether a changeset should be skipped. Pure.
pub fn evaluate(
    changes: &[PathBuf],
    commit_message: &str,
    env: &SkipEnvironment,
    rules: &SkipRules,
) -> SkipDecision {
    if env.opt_out {
        return SkipDecision::skip(format!("{} is set", rules.opt_out_env));
    }

    let message = commit_message.to_lowercase();
    if let Some(marker) = rules.markers.iter().find(|m| message.contains(m.as_str())) {
        return SkipDecision::skip(format!("commit message contains {marker}"));
    }

    if !changes.is_empty() && changes.iter().all(|c| rules.is_doc_path(c)) {
        return SkipDecision::skip("only documentation files changed");
    }

    SkipDecision::proceed()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[rstest]
    #[case(&["a.md", "b.md"], true)]
    #[case(&["a.go", "b.md"], false)]
    #[case(&["docs/guide/intro.html"], true)]
    #[case(&["pkg/docs/readme.go"], false)]
    #[case(&["pkg/a/CHANGELOG.MD"], true)]
    #[case(&["api.rst", "site.mdx", "docs/notes.txt"], true)]
    #[case(&["requirements.txt"], false)]
    #[case(&["CMakeLists.txt", "README.md"], false)]
    #[case(&["src/main.rs"], false)]
    fn doc_only_changesets(#[case] changed: &[&str], #[case] skip: bool) {
        let decision = evaluate(
            &paths(changed),
            "feat: work",
            &SkipEnvironment::default(),
            &SkipRules::default(),
        );
        assert_eq!(decision.skip, skip, "{changed:?}");
    }

    #[rstest]
    #[case("fix: typo [skip docs]")]
    #[case("chore: bump\n\n[NO DOCS]")]
    #[case("[Docs Skip] wip")]
    fn skip_markers_are_case_insensitive(#[case] message: &str) {
        let decision = evaluate(
            &paths(&["src/lib.rs"]),
            message,
            &SkipEnvironment::default(),
            &SkipRules::default(),
        );
        assert!(decision.skip);
        assert!(decision.reason.starts_with("commit message contains"));
    }

    #[test]
    fn opt_out_wins_over_everything() {
        let decision = evaluate(
            &paths(&["src/lib.rs"]),
            "feat: real change",
            &SkipEnvironment { opt_out: true },
            &SkipRules::default(),
        );
        assert_eq!(decision.reason, "DOCSYNC_SKIP is set");
    }

    #[test]
    fn empty_changeset_is_not_doc_only() {
        let decision = evaluate(&[], "", &SkipEnvironment::default(), &SkipRules::default());
        assert!(!decision.skip);
        assert!(decision.reason.is_empty());
    }

    #[test]
    fn invalid_globs_are_dropped() {
        let config = SkipConfig {
            doc_globs: vec!["[".into(), "*.md".into()],
            ..SkipConfig::default()
        };
        let rules = SkipRules::from_config(&config);
        assert!(rules.is_doc_path(Path::new("x/y.md")));
        assert!(!rules.is_doc_path(Path::new("x/y.rs")));
    }
}
