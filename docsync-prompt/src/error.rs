//! Error types for docsync-prompt.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building a prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates or listing a directory.
    #[error("prompt io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// The chosen template needs a context section that was not supplied.
    #[error("template {template} requires {missing} in its context")]
    MissingContext {
        template: &'static str,
        missing: &'static str,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PromptError {
    PromptError::Io { path: path.into(), source }
}
