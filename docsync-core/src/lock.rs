//! Cross-process scope lock.
//!
//! Possession is the presence of `<scope_dir>/lock`, created with
//! `create_new` so exactly one contender wins. Acquisition never waits.
//!
//! There is no staleness detection: a holder that dies without releasing
//! leaves the scope locked until [`force_unlock`] is called.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{io_err, StoreError};
use crate::paths;

/// Exclusive possession of a scope for the duration of one run.
///
/// Released by [`LockHandle::release`] or on drop, whichever comes first.
#[derive(Debug)]
pub struct LockHandle {
    path: PathBuf,
    released: bool,
}

impl LockHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "lock released"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to release lock")
            }
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// `<scope_dir>/lock`
pub fn lock_path(scope_dir: &Path) -> PathBuf {
    scope_dir.join(paths::LOCK_FILE)
}

/// Non-mutating check for a held lock.
pub fn is_locked(scope_dir: &Path) -> bool {
    lock_path(scope_dir).exists()
}

/// Try to take the scope lock.
///
/// Returns [`StoreError::LockHeld`] immediately if another holder exists.
pub fn acquire(scope_dir: &Path) -> Result<LockHandle, StoreError> {
    std::fs::create_dir_all(scope_dir).map_err(|e| io_err(scope_dir, e))?;
    let path = lock_path(scope_dir);

    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            return Err(StoreError::LockHeld { path });
        }
        Err(err) => return Err(io_err(&path, err)),
    };

    let handle = LockHandle {
        path,
        released: false,
    };
    // Holder details are informational only; failing to write them still
    // leaves the lock held.
    let stamp = format!("{} {}\n", std::process::id(), Utc::now().to_rfc3339());
    if let Err(err) = file.write_all(stamp.as_bytes()) {
        tracing::warn!(path = %handle.path.display(), error = %err, "failed to stamp lock file");
    }
    tracing::debug!(path = %handle.path.display(), "lock acquired");
    Ok(handle)
}

/// Release an optional handle; `None` is a no-op.
pub fn release(handle: Option<LockHandle>) {
    if let Some(mut handle) = handle {
        handle.release();
    }
}

/// Remove a lock file regardless of holder. Returns whether one existed.
pub fn force_unlock(scope_dir: &Path) -> Result<bool, StoreError> {
    let path = lock_path(scope_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_err(&path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_then_contend() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("scope");

        let handle = acquire(&dir).expect("first acquire");
        assert!(is_locked(&dir));

        let err = acquire(&dir).unwrap_err();
        assert!(matches!(err, StoreError::LockHeld { .. }), "got: {err}");

        drop(handle);
        assert!(!is_locked(&dir), "drop must release the lock");
    }

    #[test]
    fn release_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut handle = acquire(tmp.path()).unwrap();
        handle.release();
        handle.release();
        assert!(!is_locked(tmp.path()));

        // A new holder must not be disturbed by the old handle's drop.
        let second = acquire(tmp.path()).unwrap();
        drop(handle);
        assert!(is_locked(tmp.path()));
        drop(second);
    }

    #[test]
    fn release_none_is_noop() {
        release(None);
    }

    #[test]
    fn is_locked_does_not_create_anything() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("never-created");
        assert!(!is_locked(&dir));
        assert!(!dir.exists());
    }

    #[test]
    fn force_unlock_reports_presence() {
        let tmp = TempDir::new().unwrap();
        let handle = acquire(tmp.path()).unwrap();
        std::mem::forget(handle);

        assert!(force_unlock(tmp.path()).unwrap());
        assert!(!force_unlock(tmp.path()).unwrap());
    }

    #[test]
    fn lock_file_records_holder_pid() {
        let tmp = TempDir::new().unwrap();
        let handle = acquire(tmp.path()).unwrap();
        let content = std::fs::read_to_string(handle.path()).unwrap();
        assert!(content.starts_with(&std::process::id().to_string()));
    }
}
