//! `docsync unlock` — remove a scope lock left behind by a crashed run.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docsync_core::{lock, paths};

use super::ScopeArgs;

/// Arguments for `docsync unlock`.
#[derive(Args, Debug)]
pub struct UnlockArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

impl UnlockArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let scope = self.scope.resolve()?;
        let dir = paths::scope_dir(home, &scope);
        let removed = lock::force_unlock(&dir)
            .with_context(|| format!("failed to remove lock for {scope}"))?;

        if removed {
            tracing::warn!(scope = %scope, "lock removed manually");
            println!("{} lock removed for {scope}", "✓".green());
        } else {
            println!("no lock held for {scope}");
        }
        Ok(())
    }
}
