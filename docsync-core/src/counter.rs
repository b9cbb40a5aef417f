//! Per-scope frequency counter (`<scope_dir>/counter`, decimal integer).

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::paths;
use crate::tracker::write_atomic;

/// Counts observed work actions between session-path updates.
#[derive(Debug, Clone)]
pub struct Counter {
    path: PathBuf,
}

impl Counter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_scope(scope_dir: &Path) -> Self {
        Self::new(scope_dir.join(paths::COUNTER_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current value; `0` when the file does not exist.
    pub fn read(&self) -> Result<u64, StoreError> {
        read_decimal(&self.path).map(|v| v.unwrap_or(0))
    }

    pub fn set(&self, value: u64) -> Result<(), StoreError> {
        write_atomic(&self.path, &format!("{value}\n"))
    }

    /// Add one and persist. Returns the new value.
    pub fn increment(&self) -> Result<u64, StoreError> {
        let next = self.read()?.saturating_add(1);
        self.set(next)?;
        Ok(next)
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.set(0)
    }
}

/// Parse a file holding a single decimal integer. `None` if the file is absent.
pub fn read_decimal(path: &Path) -> Result<Option<u64>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| StoreError::NotANumber {
            path: path.to_path_buf(),
            found: trimmed.to_string(),
        })
}
