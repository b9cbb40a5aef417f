//! Affected-artifact resolution and discovery.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Directories never searched for artifacts.
const IGNORED_DIRS: &[&str] = &["target", "node_modules"];

/// Map each changed file to the nearest artifact owning it.
///
/// `changed` holds paths relative to `scope_root`. For each, directories are
/// walked upward from the file's parent to `scope_root` (inclusive) until one
/// containing `artifact_name` is found. Changed files that are themselves
/// artifacts are ignored, so generator output never re-triggers an update.
///
/// The result is keyed by absolute artifact path, deduplicated and ordered;
/// each value lists the changed files that artifact owns, in input order.
pub fn resolve(
    scope_root: &Path,
    changed: &[PathBuf],
    artifact_name: &str,
) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut owners: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    for file in changed {
        if file.file_name().and_then(|n| n.to_str()) == Some(artifact_name) {
            continue;
        }
        let rel = file.strip_prefix(scope_root).unwrap_or(file);
        let mut dir = rel.parent().map(Path::to_path_buf).unwrap_or_default();

        loop {
            let candidate = scope_root.join(&dir).join(artifact_name);
            if candidate.is_file() {
                owners.entry(candidate).or_default().push(rel.to_path_buf());
                break;
            }
            if !dir.pop() {
                tracing::debug!(file = %rel.display(), "no owning artifact");
                break;
            }
        }
    }

    owners
}

/// Existing artifacts under `root`, sorted, at most `max_depth` levels deep.
pub fn discover(root: &Path, artifact_name: &str, max_depth: usize) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !IGNORED_DIRS.contains(&name.as_ref())
        })
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == artifact_name)
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}
