//! Prompt context — serializable rendering payload.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, PromptError};

/// Flat rendering payload shared by every template.
///
/// `artifact` is only present for per-artifact prompts; `transcript` and
/// `existing_artifacts` are only populated for session prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContext {
    /// Absolute path of the scope root (repository or project directory).
    pub scope_path: String,
    /// File name of documentation artifacts, e.g. `CLAUDE.md`.
    pub artifact_name: String,
    /// Marker range covered by this prompt (`<base>..<head>` or `<first>..<last>`).
    pub processed_range: String,
    pub artifact: Option<ArtifactCtx>,
    /// Aggregated transcript text.
    pub transcript: String,
    /// Documentation files already present in the scope.
    pub existing_artifacts: Vec<String>,
    pub meta: MetaCtx,
}

/// Per-artifact section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactCtx {
    pub artifact_path: String,
    pub artifact_dir: String,
    /// Changed files relative to `artifact_dir`.
    pub changed_files: Vec<String>,
    /// Entries directly inside `artifact_dir`; directories carry a trailing `/`.
    pub directory_listing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub docsync_version: String,
}

impl Default for MetaCtx {
    fn default() -> Self {
        Self {
            docsync_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl PromptContext {
    /// Context for updating one artifact after a commit range.
    ///
    /// `changed_files` are absolute or scope-relative paths; each is rewritten
    /// relative to the artifact's directory when it lies beneath it.
    pub fn for_artifact(
        scope_root: &Path,
        artifact_path: &Path,
        artifact_name: &str,
        changed_files: &[PathBuf],
        directory_listing: Vec<String>,
        processed_range: &str,
    ) -> Self {
        let artifact_dir = artifact_path.parent().unwrap_or(scope_root);
        let changed_files = changed_files
            .iter()
            .map(|f| {
                let absolute = if f.is_absolute() {
                    f.clone()
                } else {
                    scope_root.join(f)
                };
                absolute
                    .strip_prefix(artifact_dir)
                    .unwrap_or(f.as_path())
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();

        Self {
            scope_path: scope_root.display().to_string(),
            artifact_name: artifact_name.to_string(),
            processed_range: processed_range.to_string(),
            artifact: Some(ArtifactCtx {
                artifact_path: artifact_path.display().to_string(),
                artifact_dir: artifact_dir.display().to_string(),
                changed_files,
                directory_listing,
            }),
            transcript: String::new(),
            existing_artifacts: Vec::new(),
            meta: MetaCtx::default(),
        }
    }

    /// Context for a session-progress update.
    pub fn for_session(
        scope_root: impl AsRef<Path>,
        artifact_name: &str,
        existing_artifacts: Vec<String>,
        processed_range: &str,
        transcript: String,
    ) -> Self {
        Self {
            scope_path: scope_root.as_ref().display().to_string(),
            artifact_name: artifact_name.to_string(),
            processed_range: processed_range.to_string(),
            artifact: None,
            transcript,
            existing_artifacts,
            meta: MetaCtx::default(),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, PromptError> {
        tera::Context::from_serialize(self).map_err(PromptError::from)
    }
}

/// Sorted, non-hidden entries directly inside `dir`.
pub fn directory_listing(dir: &Path) -> Result<Vec<String>, PromptError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry
            .file_type()
            .map_err(|e| io_err(entry.path(), e))?
            .is_dir();
        listing.push(if is_dir { format!("{name}/") } else { name });
    }
    listing.sort();
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn changed_files_are_relative_to_artifact_dir() {
        let ctx = PromptContext::for_artifact(
            Path::new("/repo"),
            Path::new("/repo/pkg/a/CLAUDE.md"),
            "CLAUDE.md",
            &[
                PathBuf::from("pkg/a/x.go"),
                PathBuf::from("/repo/pkg/a/sub/y.go"),
            ],
            vec![],
            "c0..c1",
        );
        let artifact = ctx.artifact.expect("artifact section");
        assert_eq!(artifact.artifact_dir, "/repo/pkg/a");
        assert_eq!(artifact.changed_files, vec!["x.go", "sub/y.go"]);
    }

    #[test]
    fn session_context_has_no_artifact_section() {
        let ctx = PromptContext::for_session("/repo", "CLAUDE.md", vec![], "1..3", "hi".into());
        assert!(ctx.artifact.is_none());
        assert_eq!(ctx.transcript, "hi");
        ctx.to_tera_context().expect("context conversion");
    }

    #[test]
    fn directory_listing_marks_dirs_and_hides_dotfiles() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("b.rs"), "").unwrap();
        std::fs::write(tmp.path().join("a.rs"), "").unwrap();
        std::fs::write(tmp.path().join(".hidden"), "").unwrap();

        let listing = directory_listing(tmp.path()).unwrap();
        assert_eq!(listing, vec!["a.rs", "b.rs", "sub/"]);
    }

    #[test]
    fn directory_listing_of_missing_dir_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = directory_listing(&tmp.path().join("gone")).unwrap_err();
        assert!(matches!(err, PromptError::Io { .. }));
    }
}
