//! Log-increment extraction from a JSONL session transcript.
//!
//! Only two line shapes survive:
//!
//! | Line                                           | Produces                       |
//! |------------------------------------------------|--------------------------------|
//! | `type: "assistant"` with text content          | [`LogEntryKind::AssistantMessage`] |
//! | `type: "user"` carrying a completed `toolUseResult` with an `agentId` | [`LogEntryKind::AgentResult`] |
//!
//! Everything else (tool calls, thinking blocks, system lines, malformed
//! JSON) is dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use docsync_core::{LogEntry, LogEntryKind};

use crate::error::{io_err, SyncError};

/// Transcript lines can be very long; read in large chunks.
const READ_BUFFER_BYTES: usize = 1 << 20;

const TRUNCATION_NOTICE: &str = "[... earlier transcript truncated ...]\n";

// ---------------------------------------------------------------------------
// Line shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TranscriptLine {
    Assistant(AssistantLine),
    User(UserLine),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AssistantLine {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    message: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct UserLine {
    #[serde(default)]
    timestamp: Option<String>,
    /// A string for plain tool output, an object for sub-agent results.
    #[serde(default, rename = "toolUseResult")]
    tool_use_result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Blocks(Vec<Block>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AgentResult {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "agentId")]
    agent_id: Option<String>,
    #[serde(default)]
    content: Option<Content>,
}

impl Content {
    fn text_segments(self) -> Vec<String> {
        let raw = match self {
            Content::Text(text) => vec![text],
            Content::Blocks(blocks) => blocks
                .into_iter()
                .filter_map(|b| match b {
                    Block::Text { text } => Some(text),
                    Block::Other => None,
                })
                .collect(),
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decode one transcript line into an entry, if it is one of the kept shapes.
fn parse_line(line: &str) -> Option<LogEntry> {
    match serde_json::from_str::<TranscriptLine>(line).ok()? {
        TranscriptLine::Assistant(a) => {
            let text_segments = a.message?.content?.text_segments();
            if text_segments.is_empty() {
                return None;
            }
            Some(LogEntry {
                kind: LogEntryKind::AssistantMessage,
                timestamp: parse_timestamp(a.timestamp.as_deref()),
                agent_id: None,
                text_segments,
            })
        }
        TranscriptLine::User(u) => {
            let result: AgentResult = serde_json::from_value(u.tool_use_result?).ok()?;
            if result.status.as_deref() != Some("completed") {
                return None;
            }
            let agent_id = result.agent_id.filter(|id| !id.trim().is_empty())?;
            let text_segments = result.content?.text_segments();
            if text_segments.is_empty() {
                return None;
            }
            Some(LogEntry {
                kind: LogEntryKind::AgentResult,
                timestamp: parse_timestamp(u.timestamp.as_deref()),
                agent_id: Some(agent_id),
                text_segments,
            })
        }
        TranscriptLine::Other => None,
    }
}

// ---------------------------------------------------------------------------
// Increment
// ---------------------------------------------------------------------------

/// Entries found in lines `first_line..=last_line` of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptIncrement {
    pub entries: Vec<LogEntry>,
    pub first_line: u64,
    /// Last complete line scanned; `first_line - 1` when nothing new was read.
    pub last_line: u64,
}

impl TranscriptIncrement {
    pub fn lines_scanned(&self) -> u64 {
        (self.last_line + 1).saturating_sub(self.first_line)
    }

    pub fn display_range(&self) -> String {
        format!("{}..{}", self.first_line, self.last_line)
    }
}

/// Scan `path` from 1-indexed `start_line` to EOF.
///
/// A final line without a newline terminator is still being written and is
/// left for the next scan.
pub fn read_increment(path: &Path, start_line: u64) -> Result<TranscriptIncrement, SyncError> {
    let start_line = start_line.max(1);
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_BYTES, file);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut line_no: u64 = 0;
    let mut malformed = 0usize;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(|e| io_err(path, e))?;
        if read == 0 || buf.last() != Some(&b'\n') {
            break;
        }
        line_no += 1;
        if line_no < start_line {
            continue;
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            malformed += 1;
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if serde_json::from_str::<serde::de::IgnoredAny>(line).is_err() {
            malformed += 1;
            continue;
        }
        if let Some(entry) = parse_line(line) {
            entries.push(entry);
        }
    }

    if malformed > 0 {
        tracing::debug!(path = %path.display(), malformed, "skipped malformed transcript lines");
    }

    Ok(TranscriptIncrement {
        entries,
        first_line: start_line,
        last_line: line_no.max(start_line - 1),
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Aggregate entries into prompt text, keeping at most `max_chars` of the
/// most recent content.
pub fn render_entries(entries: &[LogEntry], max_chars: usize) -> String {
    let mut out = String::new();
    for entry in entries {
        let ts = entry
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let who = match (entry.kind, entry.agent_id.as_deref()) {
            (LogEntryKind::AgentResult, Some(id)) => format!("Agent {id}"),
            (LogEntryKind::AgentResult, None) => "Agent".to_string(),
            (LogEntryKind::AssistantMessage, _) => "Assistant".to_string(),
        };
        out.push_str(&format!("[{ts}] {who}:\n"));
        for segment in &entry.text_segments {
            out.push_str(segment);
            out.push('\n');
        }
        out.push('\n');
    }

    let total = out.chars().count();
    if max_chars == 0 || total <= max_chars {
        return out;
    }
    let tail: String = out.chars().skip(total - max_chars).collect();
    format!("{TRUNCATION_NOTICE}{tail}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
