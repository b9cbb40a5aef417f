//! Tracing setup and size-based log rotation.
//!
//! Hook commands print a JSON envelope on stdout, so log output goes to
//! `~/.docsync/logs/docsync.log` instead. Rotation keeps at most
//! [`MAX_ROTATED_FILES`] copies: `docsync.log` → `docsync.log.1` → … → `.5`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use docsync_core::paths;

/// Filter directive variable, e.g. `DOCSYNC_LOG=debug`.
pub const LOG_ENV: &str = "DOCSYNC_LOG";

/// Maximum log file size before rotation (10 MiB).
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated backup files to keep.
pub const MAX_ROTATED_FILES: usize = 5;

/// Install the global subscriber. Falls back to stderr when the log file
/// cannot be opened.
pub fn init(home: &Path) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let log_path = paths::log_path(home);

    let rotation = rotate_if_needed(&log_path, MAX_LOG_BYTES, MAX_ROTATED_FILES);
    match open_log(&log_path) {
        Ok(file) => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(err) => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(io::stderr)
                .try_init();
            tracing::warn!(path = %log_path.display(), error = %err, "cannot open log file; logging to stderr");
        }
    }

    match rotation {
        Ok(true) => tracing::info!(path = %log_path.display(), "log file rotated"),
        Ok(false) => {}
        Err(err) => tracing::warn!(path = %log_path.display(), error = %err, "log rotation failed"),
    }
}

fn open_log(path: &Path) -> io::Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::OpenOptions::new().create(true).append(true).open(path)
}

/// Rotate `log_path` once it reaches `max_bytes`.
///
/// Returns `true` if rotation occurred. A missing log file is not an error.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || max_files == 0 {
        return Ok(false);
    }

    let oldest = numbered_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let src = numbered_path(log_path, n);
        if src.exists() {
            fs::rename(&src, numbered_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, numbered_path(log_path, 1))?;
    Ok(true)
}

fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(paths::LOG_FILE);
    base.with_file_name(format!("{name}.{n}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn small_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("docsync.log");
        fs::write(&log, "line\n").unwrap();
        assert!(!rotate_if_needed(&log, 1024, 5).unwrap());
        assert!(!numbered_path(&log, 1).exists());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!rotate_if_needed(&dir.path().join("docsync.log"), 1, 5).unwrap());
    }

    #[test]
    fn rotations_shift_and_cap_copies() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("docsync.log");

        for round in 1..=4u8 {
            fs::write(&log, vec![b'0' + round; 64]).unwrap();
            assert!(rotate_if_needed(&log, 32, 3).unwrap());
            assert!(!log.exists(), "live log is recreated by the next writer");
        }

        // Newest copy is .1; only three copies are kept.
        assert_eq!(fs::read(numbered_path(&log, 1)).unwrap(), vec![b'4'; 64]);
        assert_eq!(fs::read(numbered_path(&log, 3)).unwrap(), vec![b'2'; 64]);
        assert!(!numbered_path(&log, 4).exists());
    }
}
