//! The JSON object printed on stdout by trigger commands.

use std::collections::BTreeSet;

use serde::Serialize;

use docsync_core::{UpdateResult, UpdateStatus};

/// Hook response. Triggers never block the calling tool, so the decision is
/// always `allow`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub event_name: String,
    pub permission_decision: &'static str,
    pub status: UpdateStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub affected_artifacts: BTreeSet<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub processed_range: String,
}

impl Envelope {
    pub fn new(event_name: impl Into<String>, result: UpdateResult) -> Self {
        Self {
            event_name: event_name.into(),
            permission_decision: "allow",
            status: result.status,
            reason: result.reason,
            affected_artifacts: result.affected_artifacts,
            processed_range: result.processed_range,
        }
    }

    /// Print as a single JSON line.
    pub fn print(&self) {
        match serde_json::to_string(self) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize envelope"),
        }
    }
}
