//! Progress tracker — last-processed marker per scope.
//!
//! Two on-disk encodings:
//! - [`MarkerEncoding::Structured`]: `tracking.json`, a [`TrackingState`] document.
//! - [`MarkerEncoding::Plain`]: `last_line`, the bare marker followed by a newline.
//!
//! Reads accept either shape regardless of encoding, so a legacy plain-text
//! commit marker keeps working after the switch to JSON. Writes use the same
//! atomic `.tmp` + rename pattern everywhere.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{io_err, StoreError};
use crate::paths;
use crate::types::{ScopeId, ScopeKind, TrackingState};

/// On-disk encoding of a tracking marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEncoding {
    Structured,
    Plain,
}

#[derive(Debug, Deserialize)]
struct TrackingCompat {
    last_processed_marker: String,
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    strategy_version: String,
}

/// Reads and writes the tracking marker of one scope.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    path: PathBuf,
    encoding: MarkerEncoding,
}

impl ProgressTracker {
    pub fn new(path: impl Into<PathBuf>, encoding: MarkerEncoding) -> Self {
        Self {
            path: path.into(),
            encoding,
        }
    }

    /// Tracker at the conventional location for `scope`: repositories use
    /// `tracking.json`, sessions use `last_line`.
    pub fn for_scope(home: &Path, scope: &ScopeId) -> Self {
        let dir = paths::scope_dir(home, scope);
        match scope.kind {
            ScopeKind::Repository => {
                Self::new(dir.join(paths::TRACKING_FILE), MarkerEncoding::Structured)
            }
            ScopeKind::Session => Self::new(dir.join(paths::LAST_LINE_FILE), MarkerEncoding::Plain),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state, or [`TrackingState::zero`] if nothing was recorded yet.
    pub fn read(&self) -> Result<TrackingState, StoreError> {
        if !self.path.exists() {
            return Ok(TrackingState::zero());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(TrackingState::zero());
        }

        if trimmed.starts_with('{') {
            let compat: TrackingCompat =
                serde_json::from_str(trimmed).map_err(|e| StoreError::Tracking {
                    path: self.path.clone(),
                    message: e.to_string(),
                })?;
            return Ok(TrackingState {
                last_processed_marker: compat.last_processed_marker,
                updated_at: compat.updated_at.unwrap_or_else(|| self.modified_at()),
                strategy_version: compat.strategy_version,
            });
        }

        let marker = trimmed.lines().next().unwrap_or_default().trim();
        if marker.chars().any(char::is_whitespace) {
            return Err(StoreError::Tracking {
                path: self.path.clone(),
                message: format!("unexpected plain marker {marker:?}"),
            });
        }
        Ok(TrackingState {
            last_processed_marker: marker.to_string(),
            updated_at: self.modified_at(),
            strategy_version: String::new(),
        })
    }

    /// Persist `state` atomically.
    pub fn write(&self, state: &TrackingState) -> Result<(), StoreError> {
        let contents = match self.encoding {
            MarkerEncoding::Structured => serde_json::to_string_pretty(state)?,
            MarkerEncoding::Plain => format!("{}\n", state.last_processed_marker),
        };
        write_atomic(&self.path, &contents)?;
        tracing::debug!(
            path = %self.path.display(),
            marker = %state.last_processed_marker,
            "tracking state written"
        );
        Ok(())
    }

    /// Record `marker` directly, without any diff having been computed.
    pub fn initialize(
        &self,
        marker: &str,
        strategy_version: &str,
    ) -> Result<TrackingState, StoreError> {
        let state = TrackingState::new(marker, strategy_version);
        self.write(&state)?;
        Ok(state)
    }

    fn modified_at(&self) -> DateTime<Utc> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now())
    }
}

/// Write `contents` to `<path>.tmp`, then rename over `path`.
///
/// The parent directory is created if missing. The `.tmp` sibling lives in the
/// same directory so the rename never crosses filesystems.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("state path has no parent directory"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn structured(dir: &TempDir) -> ProgressTracker {
        ProgressTracker::new(dir.path().join("tracking.json"), MarkerEncoding::Structured)
    }

    #[test]
    fn zero_state_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let state = structured(&tmp).read().unwrap();
        assert_eq!(state, TrackingState::zero());
    }

    #[test]
    fn roundtrip_structured() {
        let tmp = TempDir::new().unwrap();
        let tracker = structured(&tmp);
        let state = TrackingState::new("c0ffee", "commit-range/v1");
        tracker.write(&state).unwrap();
        assert_eq!(tracker.read().unwrap(), state);
    }

    #[test]
    fn plain_encoding_writes_bare_marker() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_line");
        let tracker = ProgressTracker::new(&path, MarkerEncoding::Plain);
        tracker.initialize("42", "transcript/v1").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "42\n");
        assert_eq!(tracker.read().unwrap().last_processed_marker, "42");
    }

    #[test]
    fn legacy_plain_commit_is_read_from_structured_path() {
        let tmp = TempDir::new().unwrap();
        let tracker = structured(&tmp);
        std::fs::write(tracker.path(), "9fceb02d0ae598e95dc970b74767f19372d61af8\n").unwrap();

        let state = tracker.read().unwrap();
        assert_eq!(
            state.last_processed_marker,
            "9fceb02d0ae598e95dc970b74767f19372d61af8"
        );
        assert!(state.strategy_version.is_empty());
    }

    #[test]
    fn structured_without_updated_at_uses_file_time() {
        let tmp = TempDir::new().unwrap();
        let tracker = structured(&tmp);
        std::fs::write(tracker.path(), r#"{"last_processed_marker":"abc"}"#).unwrap();

        let state = tracker.read().unwrap();
        assert_eq!(state.last_processed_marker, "abc");
        assert!(state.updated_at > DateTime::<Utc>::default());
    }

    #[test]
    fn corrupt_json_is_a_tracking_error() {
        let tmp = TempDir::new().unwrap();
        let tracker = structured(&tmp);
        std::fs::write(tracker.path(), "{ not json").unwrap();

        let err = tracker.read().unwrap_err();
        assert!(matches!(err, StoreError::Tracking { .. }), "got: {err}");
        assert!(err.to_string().contains("tracking.json"));
    }

    #[test]
    fn tmp_file_cleaned_up_after_write() {
        let tmp = TempDir::new().unwrap();
        let tracker = structured(&tmp);
        tracker.initialize("abc", "v1").unwrap();
        assert!(!tmp_path(tracker.path()).exists());
    }

    #[test]
    fn write_creates_scope_directory() {
        let tmp = TempDir::new().unwrap();
        let scope = ScopeId::session("s-1");
        let tracker = ProgressTracker::for_scope(tmp.path(), &scope);
        tracker.initialize("7", "transcript/v1").unwrap();
        assert!(tracker.path().ends_with("last_line"));
        assert!(tracker.path().exists());
    }
}
