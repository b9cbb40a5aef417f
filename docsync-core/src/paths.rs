//! Filesystem layout under `<home>/.docsync/`.
//!
//! ```text
//! ~/.docsync/
//!   config.yaml
//!   logs/docsync.log
//!   scopes/
//!     <kind>-<hash>/
//!       tracking.json   (repository scopes)
//!       last_line       (session scopes, decimal, 1-indexed)
//!       counter         (session scopes, decimal)
//!       lock            (presence = held)
//! ```
//!
//! Every helper takes an explicit `home`; [`home`] is only called at the CLI
//! boundary. Tests always pass a `TempDir`.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::types::ScopeId;

pub const CONFIG_FILE: &str = "config.yaml";
pub const LOG_FILE: &str = "docsync.log";
pub const TRACKING_FILE: &str = "tracking.json";
pub const LAST_LINE_FILE: &str = "last_line";
pub const COUNTER_FILE: &str = "counter";
pub const LOCK_FILE: &str = "lock";

pub fn docsync_root(home: &Path) -> PathBuf {
    home.join(".docsync")
}

pub fn config_path(home: &Path) -> PathBuf {
    docsync_root(home).join(CONFIG_FILE)
}

pub fn logs_dir(home: &Path) -> PathBuf {
    docsync_root(home).join("logs")
}

pub fn log_path(home: &Path) -> PathBuf {
    logs_dir(home).join(LOG_FILE)
}

pub fn scopes_root(home: &Path) -> PathBuf {
    docsync_root(home).join("scopes")
}

/// `<home>/.docsync/scopes/<kind>-<hash>/` — pure, no I/O.
pub fn scope_dir(home: &Path, scope: &ScopeId) -> PathBuf {
    scopes_root(home).join(scope.storage_name())
}

/// Resolve the user's home directory.
pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_dir_lives_under_scopes_root() {
        let home = Path::new("/home/dev");
        let scope = ScopeId::session("abc-123");
        let dir = scope_dir(home, &scope);
        assert!(dir.starts_with("/home/dev/.docsync/scopes"));
        assert!(dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("session-")));
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(StoreError::HomeNotFound.to_string().contains("home directory"));
    }
}
