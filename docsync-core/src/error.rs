//! Error types for docsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from scope state persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON error while encoding a tracking document.
    #[error("tracking JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tracking file exists but could not be decoded.
    #[error("failed to parse tracking state at {path}: {message}")]
    Tracking { path: PathBuf, message: String },

    /// Counter or line-marker file does not hold a decimal integer.
    #[error("expected a decimal integer in {path}, found {found:?}")]
    NotANumber { path: PathBuf, found: String },

    /// YAML parse error on config load, with file path and line context.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Another run already holds the scope lock.
    #[error("scope is locked (lock file present at {path})")]
    LockHeld { path: PathBuf },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.docsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`StoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
