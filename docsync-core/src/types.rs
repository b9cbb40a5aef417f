//! Domain types shared by both trigger paths.
//!
//! Path fields use `PathBuf`; artifact identities in [`UpdateResult`] are
//! plain strings so the result serializes straight into the hook envelope.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Which trigger path a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// An interactive session, keyed by its session id.
    Session,
    /// A repository, keyed by its canonical root path.
    Repository,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Session => write!(f, "session"),
            ScopeKind::Repository => write!(f, "repository"),
        }
    }
}

/// The unit of isolation for locking, tracking and counting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId {
    pub kind: ScopeKind,
    pub key: String,
}

impl ScopeId {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Session,
            key: session_id.into(),
        }
    }

    pub fn repository(root: &Path) -> Self {
        Self {
            kind: ScopeKind::Repository,
            key: root.to_string_lossy().into_owned(),
        }
    }

    /// Stable directory name for this scope: `<kind>-<first 16 hex of sha256(key)>`.
    pub fn storage_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.key.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("{}-{}", self.kind, &digest[..16])
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

/// Last-processed position of a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    pub last_processed_marker: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub strategy_version: String,
}

impl TrackingState {
    pub fn new(marker: impl Into<String>, strategy_version: impl Into<String>) -> Self {
        Self {
            last_processed_marker: marker.into(),
            updated_at: Utc::now(),
            strategy_version: strategy_version.into(),
        }
    }

    /// State returned when a scope has never been tracked.
    pub fn zero() -> Self {
        Self {
            last_processed_marker: String::new(),
            updated_at: DateTime::<Utc>::default(),
            strategy_version: String::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.last_processed_marker.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Transcript entries
// ---------------------------------------------------------------------------

/// The two transcript shapes that survive extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryKind {
    AssistantMessage,
    AgentResult,
}

/// One meaningful transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogEntryKind,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub text_segments: Vec<String>,
}

// ---------------------------------------------------------------------------
// Update result
// ---------------------------------------------------------------------------

/// Outcome class of an orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Success,
    Skipped,
    Locked,
    Error,
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStatus::Success => write!(f, "success"),
            UpdateStatus::Skipped => write!(f, "skipped"),
            UpdateStatus::Locked => write!(f, "locked"),
            UpdateStatus::Error => write!(f, "error"),
        }
    }
}

/// Returned by every orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub status: UpdateStatus,
    pub reason: String,
    pub affected_artifacts: BTreeSet<String>,
    pub processed_range: String,
}

impl UpdateResult {
    pub fn success(reason: impl Into<String>) -> Self {
        Self::with_status(UpdateStatus::Success, reason)
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::with_status(UpdateStatus::Skipped, reason)
    }

    pub fn locked() -> Self {
        Self::with_status(UpdateStatus::Locked, "another run holds the scope lock")
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::with_status(UpdateStatus::Error, reason)
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.processed_range = range.into();
        self
    }

    pub fn with_artifacts<I, P>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.affected_artifacts = artifacts
            .into_iter()
            .map(|p| p.into().to_string_lossy().into_owned())
            .collect();
        self
    }

    fn with_status(status: UpdateStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            affected_artifacts: BTreeSet::new(),
            processed_range: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
