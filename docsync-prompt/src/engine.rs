//! Tera prompt engine — [`PromptKind`] enum and [`PromptBuilder`].
//!
//! | Kind           | Template                    | Used by              |
//! |----------------|-----------------------------|----------------------|
//! | ArtifactUpdate | `artifact_update.md.tera`   | commit-range path    |
//! | SessionUpdate  | `session_update.md.tera`    | session-progress path|

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::PromptContext;
use crate::error::{io_err, PromptError};

// ---------------------------------------------------------------------------
// Embedded templates — baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (
        "artifact_update.md.tera",
        include_str!("templates/artifact_update.md.tera"),
    ),
    (
        "session_update.md.tera",
        include_str!("templates/session_update.md.tera"),
    ),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, PromptError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("tera") {
            files.push(path);
        }
    }
    files.sort();

    let mut templates = Vec::new();
    for path in files {
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, PromptError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// PromptKind
// ---------------------------------------------------------------------------

/// The prompts the engine knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    ArtifactUpdate,
    SessionUpdate,
}

impl PromptKind {
    pub fn all() -> &'static [PromptKind] {
        &[PromptKind::ArtifactUpdate, PromptKind::SessionUpdate]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            PromptKind::ArtifactUpdate => "artifact_update.md.tera",
            PromptKind::SessionUpdate => "session_update.md.tera",
        }
    }
}

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds generator prompts from embedded templates plus optional overrides.
///
/// Construct one per run; templates are re-read from `user_template_dir`
/// every time so edits take effect on the next trigger.
pub struct PromptBuilder {
    tera: Tera,
}

impl PromptBuilder {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, PromptError> {
        Ok(PromptBuilder {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render the prompt for `kind`. Line endings are normalised to LF.
    pub fn build(&self, kind: PromptKind, ctx: &PromptContext) -> Result<String, PromptError> {
        if kind == PromptKind::ArtifactUpdate && ctx.artifact.is_none() {
            return Err(PromptError::MissingContext {
                template: kind.template_name(),
                missing: "an artifact section",
            });
        }
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(kind.template_name(), &tera_ctx)?;
        Ok(rendered.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn artifact_ctx() -> PromptContext {
        PromptContext::for_artifact(
            Path::new("/code/app"),
            Path::new("/code/app/pkg/a/CLAUDE.md"),
            "CLAUDE.md",
            &[PathBuf::from("pkg/a/file.go")],
            vec!["CLAUDE.md".into(), "file.go".into()],
            "c0..c2",
        )
    }

    #[test]
    fn builder_new_succeeds() {
        PromptBuilder::new(None).expect("embedded templates must parse");
    }

    #[test]
    fn artifact_prompt_mentions_every_placeholder() {
        let builder = PromptBuilder::new(None).unwrap();
        let prompt = builder
            .build(PromptKind::ArtifactUpdate, &artifact_ctx())
            .unwrap();
        assert!(prompt.contains("/code/app/pkg/a/CLAUDE.md"));
        assert!(prompt.contains("Repository root: /code/app"));
        assert!(prompt.contains("c0..c2"));
        assert!(prompt.contains("- file.go"));
    }

    #[test]
    fn session_prompt_embeds_transcript_and_artifacts() {
        let builder = PromptBuilder::new(None).unwrap();
        let ctx = PromptContext::for_session(
            "/code/app",
            "CLAUDE.md",
            vec!["/code/app/CLAUDE.md".into()],
            "10..42",
            "Assistant: refactored the parser".into(),
        );
        let prompt = builder.build(PromptKind::SessionUpdate, &ctx).unwrap();
        assert!(prompt.contains("refactored the parser"));
        assert!(prompt.contains("- /code/app/CLAUDE.md"));
        assert!(prompt.contains("10..42"));
        assert!(!prompt.contains("(none yet)"));
    }

    #[test]
    fn empty_artifact_list_renders_placeholder_line() {
        let builder = PromptBuilder::new(None).unwrap();
        let ctx = PromptContext::for_session("/code/app", "CLAUDE.md", vec![], "1..2", "x".into());
        let prompt = builder.build(PromptKind::SessionUpdate, &ctx).unwrap();
        assert!(prompt.contains("(none yet)"));
    }

    #[test]
    fn artifact_prompt_without_artifact_section_is_rejected() {
        let builder = PromptBuilder::new(None).unwrap();
        let ctx = PromptContext::for_session("/code/app", "CLAUDE.md", vec![], "1..2", "x".into());
        let err = builder.build(PromptKind::ArtifactUpdate, &ctx).unwrap_err();
        assert!(matches!(err, PromptError::MissingContext { .. }));
    }

    #[test]
    fn transcript_text_is_not_html_escaped() {
        let builder = PromptBuilder::new(None).unwrap();
        let ctx = PromptContext::for_session(
            "/code/app",
            "CLAUDE.md",
            vec![],
            "1..2",
            "use Vec<T> && \"quotes\"".into(),
        );
        let prompt = builder.build(PromptKind::SessionUpdate, &ctx).unwrap();
        assert!(prompt.contains("use Vec<T> && \"quotes\""));
    }

    #[test]
    fn user_template_overrides_embedded_default() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("session_update.md.tera"),
            "custom for {{ scope_path }}\r\n",
        )
        .unwrap();
        let builder = PromptBuilder::new(Some(tmp.path())).unwrap();
        let ctx = PromptContext::for_session("/code/app", "CLAUDE.md", vec![], "1..2", "x".into());
        let prompt = builder.build(PromptKind::SessionUpdate, &ctx).unwrap();
        assert_eq!(prompt, "custom for /code/app\n");

        // The other template keeps its embedded default.
        let artifact = builder
            .build(PromptKind::ArtifactUpdate, &artifact_ctx())
            .unwrap();
        assert!(artifact.contains("Commit range"));
    }

    #[test]
    fn missing_user_dir_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        PromptBuilder::new(Some(&tmp.path().join("absent"))).expect("defaults only");
    }

    #[test]
    fn broken_user_template_is_reported() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("session_update.md.tera"), "{% if %}").unwrap();
        assert!(matches!(
            PromptBuilder::new(Some(tmp.path())),
            Err(PromptError::Tera(_))
        ));
    }

    #[test]
    fn every_kind_has_an_embedded_template() {
        for kind in PromptKind::all() {
            assert!(
                TPLS.iter().any(|(name, _)| *name == kind.template_name()),
                "no embedded template for {kind:?}"
            );
        }
    }
}
