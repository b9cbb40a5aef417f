//! docsync core library — scope types, persisted scope state, configuration.
//!
//! - [`types`] — scopes, tracking state, transcript entries, update results
//! - [`tracker`] — atomic last-processed-marker persistence
//! - [`lock`] — non-blocking cross-process scope lock
//! - [`counter`] — session-path frequency counter
//! - [`config`] — `~/.docsync/config.yaml`
//! - [`paths`] — on-disk layout

pub mod config;
pub mod counter;
pub mod error;
pub mod lock;
pub mod paths;
pub mod tracker;
pub mod types;

pub use config::Config;
pub use counter::Counter;
pub use error::StoreError;
pub use lock::LockHandle;
pub use tracker::{MarkerEncoding, ProgressTracker};
pub use types::{
    LogEntry, LogEntryKind, ScopeId, ScopeKind, TrackingState, UpdateResult, UpdateStatus,
};
