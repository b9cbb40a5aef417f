//! `docsync commit` — commit-range trigger, meant for a `post-commit` hook.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::Args;

use docsync_core::{config, UpdateResult};
use docsync_sync::{
    generator::detach, run_commit_range, InvocationContext, Invoker, ProcessGenerator,
    SkipEnvironment,
};

use crate::envelope::Envelope;

const EVENT: &str = "PostCommit";

/// Arguments for `docsync commit`.
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Repository to synchronize (defaults to the current directory).
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Re-launch detached and return immediately.
    #[arg(long)]
    pub background: bool,
}

impl CommitArgs {
    /// Always succeeds; the outcome is reported in the envelope.
    pub fn run(self, home: &Path) -> Result<()> {
        let result = self.execute(home).unwrap_or_else(|e| {
            tracing::error!(error = %format!("{e:#}"), "commit sync failed");
            UpdateResult::error(format!("{e:#}"))
        });
        Envelope::new(EVENT, result).print();
        Ok(())
    }

    fn execute(&self, home: &Path) -> Result<UpdateResult> {
        let repo = match &self.repo {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("could not determine current directory")?,
        };

        if self.background {
            relaunch_detached(&repo)?;
            return Ok(UpdateResult::success("commit sync continues in the background"));
        }

        let config = config::load_at(home).context("failed to load config")?;
        let generator = ProcessGenerator::from_config(&config.generator);
        let invoker = Invoker::new(&generator, InvocationContext::from_env());
        Ok(run_commit_range(
            home,
            &config,
            &repo,
            invoker,
            SkipEnvironment::from_env(&config.skip),
        ))
    }
}

/// Start `docsync commit --repo <repo>` in its own process group.
fn relaunch_detached(repo: &Path) -> Result<()> {
    let exe = std::env::current_exe().context("could not locate the docsync executable")?;
    let mut cmd = Command::new(&exe);
    cmd.arg("commit")
        .arg("--repo")
        .arg(repo)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut cmd);

    let child = cmd
        .spawn()
        .with_context(|| format!("failed to start {}", exe.display()))?;
    tracing::info!(pid = child.id(), repo = %repo.display(), "commit sync detached");
    Ok(())
}
