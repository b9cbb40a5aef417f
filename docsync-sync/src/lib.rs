//! # docsync-sync
//!
//! Change extraction, skip rules, artifact resolution, generator invocation
//! and the orchestrator that ties them together.
//!
//! Call [`run_commit_range`] after a commit or [`run_session_progress`] after
//! a session work action; both return an [`docsync_core::UpdateResult`].

pub mod artifacts;
pub mod changes;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod skip;

pub use error::SyncError;
pub use generator::{
    Generator, GeneratorOutput, Invocation, InvocationContext, Invoker, ProcessGenerator,
    Submission, GUARD_ENV,
};
pub use pipeline::{
    run, run_commit_range, run_session_progress, tool_response_succeeded, CommitRangeSource,
    SessionTrigger, SyncSource, TranscriptSource,
};
pub use skip::{SkipDecision, SkipEnvironment, SkipRules};
