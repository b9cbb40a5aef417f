use std::fs;
use std::path::PathBuf;

use docsync_prompt::{context::directory_listing, PromptBuilder, PromptContext, PromptKind};
use tempfile::TempDir;

fn scaffold_repo() -> TempDir {
    let repo = TempDir::new().expect("repo");
    let pkg = repo.path().join("pkg").join("a");
    fs::create_dir_all(pkg.join("internal")).expect("mkdir");
    fs::write(pkg.join("CLAUDE.md"), "# pkg/a\n").expect("artifact");
    fs::write(pkg.join("file.go"), "package a\n").expect("source");
    fs::write(pkg.join("file_test.go"), "package a\n").expect("test");
    repo
}

#[test]
fn artifact_prompt_from_real_directory() {
    let repo = scaffold_repo();
    let artifact = repo.path().join("pkg/a/CLAUDE.md");
    let listing = directory_listing(artifact.parent().expect("parent")).expect("listing");
    assert_eq!(listing, vec!["CLAUDE.md", "file.go", "file_test.go", "internal/"]);

    let ctx = PromptContext::for_artifact(
        repo.path(),
        &artifact,
        "CLAUDE.md",
        &[PathBuf::from("pkg/a/file.go"), PathBuf::from("pkg/a/internal/x.go")],
        listing,
        "c0..c2",
    );
    let prompt = PromptBuilder::new(None)
        .expect("builder")
        .build(PromptKind::ArtifactUpdate, &ctx)
        .expect("build");

    assert!(prompt.contains(&artifact.display().to_string()));
    assert!(prompt.contains(&format!("Repository root: {}", repo.path().display())));
    assert!(prompt.contains("- internal/x.go"));
    assert!(prompt.contains("- internal/"));
    assert!(!prompt.contains('\r'));
}

#[test]
fn prompt_text_is_delivered_verbatim_even_with_shell_metacharacters() {
    let ctx = PromptContext::for_session(
        "/code/app",
        "CLAUDE.md",
        vec![],
        "1..9",
        "ran `rm -rf $(pwd)`; echo \"done\" | tee log".into(),
    );
    let prompt = PromptBuilder::new(None)
        .expect("builder")
        .build(PromptKind::SessionUpdate, &ctx)
        .expect("build");
    assert!(prompt.contains("ran `rm -rf $(pwd)`; echo \"done\" | tee log"));
}

#[test]
fn templates_are_reloaded_per_builder() {
    let templates = TempDir::new().expect("templates");
    let path = templates.path().join("session_update.md.tera");
    let ctx = PromptContext::for_session("/code/app", "CLAUDE.md", vec![], "1..2", "x".into());

    fs::write(&path, "v1 {{ processed_range }}").expect("write v1");
    let first = PromptBuilder::new(Some(templates.path()))
        .expect("builder v1")
        .build(PromptKind::SessionUpdate, &ctx)
        .expect("build v1");

    fs::write(&path, "v2 {{ processed_range }}").expect("write v2");
    let second = PromptBuilder::new(Some(templates.path()))
        .expect("builder v2")
        .build(PromptKind::SessionUpdate, &ctx)
        .expect("build v2");

    assert_eq!(first, "v1 1..2");
    assert_eq!(second, "v2 1..2");
}
