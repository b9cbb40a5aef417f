//! docsync — keeps documentation artifacts in step with ongoing work.
//!
//! # Usage
//!
//! ```text
//! docsync hook                                  # session hook; payload on stdin
//! docsync commit [--repo <path>] [--background] # post-commit hook
//! docsync status [--repo <path> | --session <id>] [--json]
//! docsync unlock [--repo <path> | --session <id>]
//! ```

mod commands;
mod envelope;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{commit::CommitArgs, hook::HookArgs, status::StatusArgs, unlock::UnlockArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "docsync",
    version,
    about = "Incrementally synchronize documentation with sessions and commits",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count a session work action and update docs every N actions.
    Hook(HookArgs),

    /// Update docs affected by commits since the last synchronized one.
    Commit(CommitArgs),

    /// Show tracking, lock and counter state of a scope.
    Status(StatusArgs),

    /// Remove a stale scope lock.
    Unlock(UnlockArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = docsync_core::paths::home().context("could not determine home directory")?;
    logging::init(&home);

    match cli.command {
        Commands::Hook(args) => args.run(&home),
        Commands::Commit(args) => args.run(&home),
        Commands::Status(args) => args.run(&home),
        Commands::Unlock(args) => args.run(&home),
    }
}
