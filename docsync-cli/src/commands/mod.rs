pub mod commit;
pub mod hook;
pub mod status;
pub mod unlock;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use docsync_core::ScopeId;
use docsync_sync::changes::Git;

/// Scope selection shared by `status` and `unlock`.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Repository scope (defaults to the repository containing the current directory).
    #[arg(long, conflicts_with = "session")]
    pub repo: Option<PathBuf>,

    /// Session scope, by session id.
    #[arg(long)]
    pub session: Option<String>,
}

impl ScopeArgs {
    pub fn resolve(&self) -> Result<ScopeId> {
        if let Some(session) = &self.session {
            return Ok(ScopeId::session(session.as_str()));
        }
        let dir = match &self.repo {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let git = Git::discover(&dir)
            .with_context(|| format!("{} is not inside a git repository", dir.display()))?;
        Ok(ScopeId::repository(git.repo()))
    }
}
