//! Commit-range extraction through the `git` binary.
//!
//! Every call passes discrete arguments to [`std::process::Command`]; nothing
//! is ever assembled into a shell string.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::SyncError;

/// Fallback branch tried after the configured default branch.
const LAST_RESORT_BRANCH: &str = "main";

/// Thin client over `git`, rooted at one working tree.
#[derive(Debug, Clone)]
pub struct Git {
    repo: PathBuf,
}

/// The diff an orchestrator run processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub base: String,
    pub head: String,
    /// Changed paths, relative to the repository root, in git's order.
    pub files: Vec<PathBuf>,
    /// `true` when `base` came from a merge-base fallback.
    pub fell_back: bool,
}

impl CommitRange {
    pub fn display_range(&self) -> String {
        format!("{}..{}", self.base, self.head)
    }

    /// The fallback base is HEAD itself: HEAD sits on the fallback branch
    /// and the tracked commit was rewritten away, so the range between the
    /// two is unknown.
    pub fn lost_track(&self) -> bool {
        self.fell_back && self.base == self.head
    }
}

impl Git {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    /// Client rooted at the top level of the working tree containing `dir`.
    pub fn discover(dir: &Path) -> Result<Self, SyncError> {
        let top = Self::new(dir).run(&["rev-parse", "--show-toplevel"])?;
        Ok(Self::new(PathBuf::from(top)))
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn head(&self) -> Result<String, SyncError> {
        self.run(&["rev-parse", "HEAD"])
    }

    /// Whether the object `commit` names exists and is a commit.
    ///
    /// `commit` must be a hexadecimal object id; anything else is rejected
    /// before it reaches git.
    pub fn commit_exists(&self, commit: &str) -> Result<bool, SyncError> {
        if !is_object_id(commit) {
            return Err(SyncError::InvalidMarker {
                marker: commit.to_string(),
                expected: "a commit id",
            });
        }

        let object = format!("{commit}^{{commit}}");
        let args = ["rev-parse", "--verify", "--quiet", object.as_str()];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(true),
            // unknown object: pruned after a rewrite, or never fetched
            Some(1) => Ok(false),
            _ => Err(failure(&args, &output)),
        }
    }

    /// Whether `commit` exists and is an ancestor of (or equal to) HEAD.
    pub fn is_reachable(&self, commit: &str) -> Result<bool, SyncError> {
        if !self.commit_exists(commit)? {
            return Ok(false);
        }
        let args = ["merge-base", "--is-ancestor", commit, "HEAD"];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(failure(&args, &output)),
        }
    }

    /// Best common ancestor of `a` and `b`, if one exists.
    pub fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>, SyncError> {
        let args = ["merge-base", a, b];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(Some(stdout_trimmed(&output))),
            Some(1) | Some(128) => Ok(None),
            _ => Err(failure(&args, &output)),
        }
    }

    /// Paths changed between `base` and `head`.
    pub fn diff_names(&self, base: &str, head: &str) -> Result<Vec<PathBuf>, SyncError> {
        let args = ["diff", "--name-only", "-z", base, head];
        let output = self.output(&args)?;
        if !output.status.success() {
            return Err(failure(&args, &output));
        }
        Ok(output
            .stdout
            .split(|b| *b == 0)
            .filter(|name| !name.is_empty())
            .map(|name| PathBuf::from(String::from_utf8_lossy(name).into_owned()))
            .collect())
    }

    /// Full message of `rev`.
    pub fn commit_message(&self, rev: &str) -> Result<String, SyncError> {
        self.run(&["log", "-1", "--format=%B", rev])
    }

    fn run(&self, args: &[&str]) -> Result<String, SyncError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(failure(args, &output));
        }
        Ok(stdout_trimmed(&output))
    }

    fn output(&self, args: &[&str]) -> Result<Output, SyncError> {
        tracing::trace!(repo = %self.repo.display(), ?args, "git");
        Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .output()
            .map_err(SyncError::GitSpawn)
    }
}

/// Full or abbreviated hexadecimal object id.
fn is_object_id(s: &str) -> bool {
    (4..=64).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn stdout_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn failure(args: &[&str], output: &Output) -> SyncError {
    SyncError::Git {
        args: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Range resolution
// ---------------------------------------------------------------------------

/// Compute the range `(last, HEAD]` and its changed files.
///
/// When `last` is no longer reachable from HEAD (history rewritten, branch
/// switched) the base falls back, in order, to:
///
/// 1. `merge-base HEAD <last>` while the rewritten commit still exists,
/// 2. `merge-base HEAD <default_branch>`,
/// 3. `merge-base HEAD main` if that is a different branch.
pub fn resolve_range(
    git: &Git,
    last: &str,
    default_branch: &str,
) -> Result<CommitRange, SyncError> {
    let head = git.head()?;

    let (base, fell_back) = if git.is_reachable(last)? {
        (last.to_string(), false)
    } else {
        let mut candidates = vec![default_branch.to_string()];
        if default_branch != LAST_RESORT_BRANCH {
            candidates.push(LAST_RESORT_BRANCH.to_string());
        }

        let mut found = None;
        if git.commit_exists(last)? {
            if let Some(base) = git.merge_base("HEAD", last)? {
                tracing::warn!(
                    marker = %last,
                    base = %base,
                    "tracked commit rewritten; using its merge-base with HEAD"
                );
                found = Some(base);
            }
        }
        for branch in &candidates {
            if found.is_some() {
                break;
            }
            if let Some(base) = git.merge_base("HEAD", branch)? {
                tracing::warn!(
                    marker = %last,
                    branch = %branch,
                    base = %base,
                    "tracked commit unreachable; using merge-base"
                );
                found = Some(base);
            }
        }
        match found {
            Some(base) => (base, true),
            None => {
                return Err(SyncError::UnreachableBase {
                    marker: last.to_string(),
                    tried: candidates,
                })
            }
        }
    };

    let files = if base == head {
        Vec::new()
    } else {
        git.diff_names(&base, &head)?
    };

    Ok(CommitRange {
        base,
        head,
        files,
        fell_back,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
