//! Change extraction for both trigger paths.
//!
//! - [`git`]: file-level diff between the tracked commit and HEAD.
//! - [`transcript`]: new meaningful entries appended to a session transcript.

pub mod git;
pub mod transcript;

pub use git::{resolve_range, CommitRange, Git};
pub use transcript::{read_increment, render_entries, TranscriptIncrement};
