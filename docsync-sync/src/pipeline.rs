//! Shared orchestration for both trigger paths.
//!
//! ```text
//! acquire lock ──held──▶ Locked
//!   │
//! read tracking ──absent & source initializes──▶ initialize ─▶ Success
//!   │
//! extract ──error──▶ Error
//!   │ ──history lost──▶ re-anchor ─▶ Success
//!   │ ──empty──▶ Skipped
//! skip rules ──match──▶ Skipped
//!   │
//! apply (per-artifact failures logged, run continues)
//!   │
//! advance tracking ─▶ Success
//! ```
//!
//! Hard errors are caught at the top, logged, and returned as an `Error`
//! result; tracking is only written by initialization or a completed apply.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use docsync_core::{
    lock, paths, Config, Counter, ProgressTracker, ScopeId, StoreError, TrackingState,
    UpdateResult,
};
use docsync_prompt::{context::directory_listing, PromptBuilder, PromptContext, PromptKind};

use crate::artifacts;
use crate::changes::{
    read_increment, render_entries, resolve_range, CommitRange, Git, TranscriptIncrement,
};
use crate::error::SyncError;
use crate::generator::{artifact_cwd, Invocation, Invoker, Submission};
use crate::skip::{evaluate, SkipDecision, SkipEnvironment, SkipRules};

pub const COMMIT_RANGE_STRATEGY: &str = "commit-range/v1";
pub const TRANSCRIPT_STRATEGY: &str = "transcript/v1";

/// How deep the session path looks for existing artifacts.
const DISCOVER_DEPTH: usize = 6;

// ---------------------------------------------------------------------------
// SyncSource
// ---------------------------------------------------------------------------

/// Changes between the tracked marker and the current one.
#[derive(Debug, Clone)]
pub struct Extraction<C> {
    pub changes: C,
    /// Marker recorded once the changes have been applied.
    pub next_marker: String,
    /// Human-readable `from..to` range.
    pub range: String,
    /// What changed cannot be determined; adopt `next_marker` without
    /// applying anything.
    pub reanchor: bool,
}

/// Outcome of the apply step.
#[derive(Debug, Clone, Default)]
pub struct Applied {
    pub artifacts: BTreeSet<PathBuf>,
    pub reason: String,
}

/// One trigger path: where changes come from and what is done with them.
pub trait SyncSource {
    type Changes;

    fn scope(&self) -> &ScopeId;

    fn strategy_version(&self) -> &'static str;

    /// Marker to adopt when the scope has never been tracked, or `None` to
    /// process from the beginning instead.
    fn first_run_marker(&self) -> Result<Option<String>, SyncError>;

    fn extract(&self, last: &TrackingState) -> Result<Extraction<Self::Changes>, SyncError>;

    fn is_empty(&self, changes: &Self::Changes) -> bool;

    fn skip(&self, extraction: &Extraction<Self::Changes>) -> Result<SkipDecision, SyncError>;

    fn apply(&self, extraction: &Extraction<Self::Changes>) -> Result<Applied, SyncError>;
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run one synchronization pass for `source`. Never panics, never returns
/// `Err`: every outcome is an [`UpdateResult`].
pub fn run<S: SyncSource>(home: &Path, source: &S) -> UpdateResult {
    let scope = source.scope();
    let dir = paths::scope_dir(home, scope);

    let handle = match lock::acquire(&dir) {
        Ok(handle) => handle,
        Err(StoreError::LockHeld { .. }) => {
            tracing::info!(scope = %scope, "scope locked by another run");
            return UpdateResult::locked();
        }
        Err(e) => return failed(scope, e.into()),
    };

    let result = match run_locked(home, source) {
        Ok(result) => result,
        Err(e) => failed(scope, e),
    };
    lock::release(Some(handle));

    tracing::info!(
        scope = %scope,
        status = %result.status,
        range = %result.processed_range,
        reason = %result.reason,
        "sync finished"
    );
    result
}

fn run_locked<S: SyncSource>(home: &Path, source: &S) -> Result<UpdateResult, SyncError> {
    let scope = source.scope();
    let tracker = ProgressTracker::for_scope(home, scope);
    let state = tracker.read()?;

    if !state.is_initialized() {
        if let Some(marker) = source.first_run_marker()? {
            tracker.initialize(&marker, source.strategy_version())?;
            tracing::info!(scope = %scope, marker = %marker, "tracking initialized");
            return Ok(UpdateResult::success("initialized tracking").with_range(marker));
        }
    } else if !state.strategy_version.is_empty()
        && state.strategy_version != source.strategy_version()
    {
        tracing::warn!(
            scope = %scope,
            recorded = %state.strategy_version,
            current = source.strategy_version(),
            "tracking written by a different strategy version; honouring marker"
        );
    }

    let extraction = source.extract(&state)?;
    if extraction.reanchor {
        tracker.write(&TrackingState::new(
            extraction.next_marker.as_str(),
            source.strategy_version(),
        ))?;
        tracing::warn!(
            scope = %scope,
            previous = %state.last_processed_marker,
            marker = %extraction.next_marker,
            "tracking re-initialized after history rewrite"
        );
        return Ok(UpdateResult::success("re-initialized tracking after history rewrite")
            .with_range(extraction.next_marker));
    }
    if source.is_empty(&extraction.changes) {
        return Ok(UpdateResult::skipped("no changes since last run").with_range(extraction.range));
    }

    let decision = source.skip(&extraction)?;
    if decision.skip {
        return Ok(UpdateResult::skipped(decision.reason).with_range(extraction.range));
    }

    let applied = source.apply(&extraction)?;
    tracker.write(&TrackingState::new(
        extraction.next_marker.as_str(),
        source.strategy_version(),
    ))?;

    Ok(UpdateResult::success(applied.reason)
        .with_range(extraction.range)
        .with_artifacts(applied.artifacts))
}

fn failed(scope: &ScopeId, err: SyncError) -> UpdateResult {
    tracing::error!(scope = %scope, error = %err, "sync failed");
    UpdateResult::error(err.to_string())
}

// ---------------------------------------------------------------------------
// Commit-range source
// ---------------------------------------------------------------------------

/// Repository scope fed by `git diff <last>..HEAD`; one synchronous
/// generator call per affected artifact.
pub struct CommitRangeSource<'a> {
    scope: ScopeId,
    git: Git,
    config: &'a Config,
    invoker: Invoker<'a>,
    skip_env: SkipEnvironment,
}

impl<'a> CommitRangeSource<'a> {
    pub fn new(
        git: Git,
        config: &'a Config,
        invoker: Invoker<'a>,
        skip_env: SkipEnvironment,
    ) -> Self {
        Self {
            scope: ScopeId::repository(git.repo()),
            git,
            config,
            invoker,
            skip_env,
        }
    }
}

impl SyncSource for CommitRangeSource<'_> {
    type Changes = CommitRange;

    fn scope(&self) -> &ScopeId {
        &self.scope
    }

    fn strategy_version(&self) -> &'static str {
        COMMIT_RANGE_STRATEGY
    }

    fn first_run_marker(&self) -> Result<Option<String>, SyncError> {
        self.git.head().map(Some)
    }

    fn extract(&self, last: &TrackingState) -> Result<Extraction<CommitRange>, SyncError> {
        let range = resolve_range(
            &self.git,
            &last.last_processed_marker,
            &self.config.default_branch,
        )?;
        tracing::debug!(
            scope = %self.scope,
            range = %range.display_range(),
            files = range.files.len(),
            fell_back = range.fell_back,
            "commit range extracted"
        );
        Ok(Extraction {
            next_marker: range.head.clone(),
            range: range.display_range(),
            reanchor: range.lost_track(),
            changes: range,
        })
    }

    fn is_empty(&self, changes: &CommitRange) -> bool {
        changes.files.is_empty()
    }

    fn skip(&self, extraction: &Extraction<CommitRange>) -> Result<SkipDecision, SyncError> {
        let message = self.git.commit_message(&extraction.changes.head)?;
        Ok(evaluate(
            &extraction.changes.files,
            &message,
            &self.skip_env,
            &SkipRules::from_config(&self.config.skip),
        ))
    }

    fn apply(&self, extraction: &Extraction<CommitRange>) -> Result<Applied, SyncError> {
        let root = self.git.repo();
        let owners = artifacts::resolve(root, &extraction.changes.files, &self.config.artifact_name);
        if owners.is_empty() {
            return Ok(Applied {
                artifacts: BTreeSet::new(),
                reason: "no affected artifacts".to_string(),
            });
        }

        let prompts = PromptBuilder::new(self.config.templates_dir.as_deref())?;
        let total = owners.len();
        let mut updated = BTreeSet::new();

        for (artifact, files) in owners {
            match self.update_artifact(&prompts, root, &artifact, &files, &extraction.range) {
                Ok(()) => {
                    tracing::info!(artifact = %artifact.display(), files = files.len(), "artifact updated");
                    updated.insert(artifact);
                }
                Err(SyncError::RecursionGuard) => return Err(SyncError::RecursionGuard),
                Err(e) => {
                    tracing::warn!(artifact = %artifact.display(), error = %e, "artifact update failed");
                }
            }
        }

        let reason = if updated.len() == total {
            format!("updated {total} artifact(s)")
        } else {
            format!("updated {} of {total} artifact(s)", updated.len())
        };
        Ok(Applied {
            artifacts: updated,
            reason,
        })
    }
}

impl CommitRangeSource<'_> {
    fn update_artifact(
        &self,
        prompts: &PromptBuilder,
        root: &Path,
        artifact: &Path,
        files: &[PathBuf],
        range: &str,
    ) -> Result<(), SyncError> {
        let cwd = artifact_cwd(artifact, root);
        let listing = directory_listing(&cwd)?;
        let ctx = PromptContext::for_artifact(
            root,
            artifact,
            &self.config.artifact_name,
            files,
            listing,
            range,
        );
        let prompt = prompts.build(PromptKind::ArtifactUpdate, &ctx)?;
        let invocation = Invocation::new(prompt, cwd).with_model(self.config.generator.model.clone());
        self.invoker.run(&invocation)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transcript source
// ---------------------------------------------------------------------------

/// Session scope fed by new transcript lines; one background generator call.
pub struct TranscriptSource<'a> {
    scope: ScopeId,
    transcript: PathBuf,
    project_dir: PathBuf,
    config: &'a Config,
    invoker: Invoker<'a>,
    skip_env: SkipEnvironment,
}

impl<'a> TranscriptSource<'a> {
    pub fn new(
        trigger: &SessionTrigger,
        config: &'a Config,
        invoker: Invoker<'a>,
        skip_env: SkipEnvironment,
    ) -> Self {
        Self {
            scope: ScopeId::session(trigger.session_id.as_str()),
            transcript: trigger.transcript_path.clone(),
            project_dir: trigger.project_dir.clone(),
            config,
            invoker,
            skip_env,
        }
    }
}

impl SyncSource for TranscriptSource<'_> {
    type Changes = TranscriptIncrement;

    fn scope(&self) -> &ScopeId {
        &self.scope
    }

    fn strategy_version(&self) -> &'static str {
        TRANSCRIPT_STRATEGY
    }

    fn first_run_marker(&self) -> Result<Option<String>, SyncError> {
        Ok(None)
    }

    fn extract(&self, last: &TrackingState) -> Result<Extraction<TranscriptIncrement>, SyncError> {
        let marker = last.last_processed_marker.trim();
        let last_line: u64 = if marker.is_empty() {
            0
        } else {
            marker.parse().map_err(|_| SyncError::InvalidMarker {
                marker: marker.to_string(),
                expected: "a line number",
            })?
        };

        let increment = read_increment(&self.transcript, last_line.saturating_add(1))?;
        tracing::debug!(
            scope = %self.scope,
            lines = increment.lines_scanned(),
            entries = increment.entries.len(),
            "transcript increment extracted"
        );
        Ok(Extraction {
            next_marker: increment.last_line.to_string(),
            range: increment.display_range(),
            reanchor: false,
            changes: increment,
        })
    }

    fn is_empty(&self, changes: &TranscriptIncrement) -> bool {
        changes.entries.is_empty()
    }

    fn skip(&self, _extraction: &Extraction<TranscriptIncrement>) -> Result<SkipDecision, SyncError> {
        Ok(evaluate(
            &[],
            "",
            &self.skip_env,
            &SkipRules::from_config(&self.config.skip),
        ))
    }

    fn apply(&self, extraction: &Extraction<TranscriptIncrement>) -> Result<Applied, SyncError> {
        let existing: Vec<String> =
            artifacts::discover(&self.project_dir, &self.config.artifact_name, DISCOVER_DEPTH)
                .into_iter()
                .map(|p| p.display().to_string())
                .collect();
        let transcript = render_entries(
            &extraction.changes.entries,
            self.config.session.max_transcript_chars,
        );
        let ctx = PromptContext::for_session(
            &self.project_dir,
            &self.config.artifact_name,
            existing,
            &extraction.range,
            transcript,
        );
        let prompt = PromptBuilder::new(self.config.templates_dir.as_deref())?
            .build(PromptKind::SessionUpdate, &ctx)?;

        let invocation = Invocation::new(prompt, self.project_dir.as_path())
            .with_model(self.config.generator.model.clone());
        let reason = match self.invoker.submit(&invocation)? {
            Submission::Launched => format!(
                "generator launched for {} transcript entries",
                extraction.changes.entries.len()
            ),
            Submission::Suppressed => "generator suppressed inside a generator process".to_string(),
        };
        Ok(Applied {
            artifacts: BTreeSet::new(),
            reason,
        })
    }
}

// ---------------------------------------------------------------------------
// Session-progress trigger
// ---------------------------------------------------------------------------

/// What the session hook knows about the action that just happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTrigger {
    pub session_id: String,
    pub transcript_path: PathBuf,
    pub project_dir: PathBuf,
    /// Tool that produced this event, when the hook payload names one.
    pub tool_name: Option<String>,
    /// `false` when the tool reported a failure; failed actions are not
    /// counted.
    pub tool_succeeded: bool,
}

/// Whether a hook `tool_response` reports success.
///
/// A response fails when it carries `success: false`, `is_error: true` or a
/// non-null `error`. Anything else, including non-object responses, counts
/// as success.
pub fn tool_response_succeeded(response: &serde_json::Value) -> bool {
    let Some(fields) = response.as_object() else {
        return true;
    };
    let failed = fields.get("success").and_then(|v| v.as_bool()) == Some(false)
        || fields.get("is_error").and_then(|v| v.as_bool()) == Some(true)
        || fields.get("error").is_some_and(|v| !v.is_null());
    !failed
}

/// Count one work action; every `session.frequency` actions, reset the
/// counter and run the transcript pipeline.
pub fn run_session_progress(
    home: &Path,
    config: &Config,
    trigger: &SessionTrigger,
    invoker: Invoker<'_>,
    skip_env: SkipEnvironment,
) -> UpdateResult {
    let scope = ScopeId::session(trigger.session_id.as_str());

    if let Some(tool) = trigger.tool_name.as_deref() {
        if !config.session.counts_tool(tool) {
            return UpdateResult::skipped(format!("{tool} does not count as a work action"));
        }
    }
    if !trigger.tool_succeeded {
        let tool = trigger.tool_name.as_deref().unwrap_or("tool");
        tracing::debug!(scope = %scope, tool, "failed action not counted");
        return UpdateResult::skipped(format!("{tool} failed; not counted as a work action"));
    }

    let counter = Counter::in_scope(&paths::scope_dir(home, &scope));
    let frequency = config.session.frequency.max(1);
    let count = match counter.increment() {
        Ok(count) => count,
        Err(e) => return failed(&scope, e.into()),
    };
    if count < frequency {
        tracing::debug!(scope = %scope, count, frequency, "below update threshold");
        return UpdateResult::skipped(format!("{count}/{frequency} actions since last update"));
    }
    if let Err(e) = counter.reset() {
        return failed(&scope, e.into());
    }

    run(home, &TranscriptSource::new(trigger, config, invoker, skip_env))
}

/// Run the commit-range path for the repository containing `dir`.
pub fn run_commit_range(
    home: &Path,
    config: &Config,
    dir: &Path,
    invoker: Invoker<'_>,
    skip_env: SkipEnvironment,
) -> UpdateResult {
    match Git::discover(dir) {
        Ok(git) => run(home, &CommitRangeSource::new(git, config, invoker, skip_env)),
        Err(e) => {
            tracing::error!(dir = %dir.display(), error = %e, "not inside a git repository");
            UpdateResult::error(e.to_string())
        }
    }
}
