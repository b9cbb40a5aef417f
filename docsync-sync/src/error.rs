//! Error types for docsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use docsync_core::StoreError;
use docsync_prompt::PromptError;

/// Hard failures of a synchronization run.
///
/// The orchestrator turns every one of these into an `Error` update result;
/// expected outcomes (locked, skipped, nothing changed) never surface here.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Scope state could not be read or written.
    #[error("scope state error: {0}")]
    Store(#[from] StoreError),

    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git` ran but exited unsuccessfully.
    #[error("git {args} failed: {stderr}")]
    Git { args: String, stderr: String },

    /// `git` could not be started at all.
    #[error("failed to run git: {0}")]
    GitSpawn(#[source] std::io::Error),

    /// The tracked commit is gone and no fallback base could be computed.
    #[error("tracked commit {marker} is unreachable from HEAD (fallbacks tried: {})", tried.join(", "))]
    UnreachableBase { marker: String, tried: Vec<String> },

    #[error("invalid tracking marker {marker:?}: expected {expected}")]
    InvalidMarker {
        marker: String,
        expected: &'static str,
    },

    /// A synchronous generator call was made from inside a generator process.
    #[error("refusing to invoke the generator from inside a generator process")]
    RecursionGuard,

    #[error("failed to start generator {program}: {source}")]
    GeneratorSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The generator exited non-zero.
    #[error("generator exited with {status}: {stderr}")]
    GeneratorFailed { status: String, stderr: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
