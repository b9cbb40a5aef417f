//! `docsync status` — tracking, lock and counter state of one scope.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use docsync_core::{lock, paths, Counter, ProgressTracker, ScopeId};

use super::ScopeArgs;

/// Arguments for `docsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ScopeStatus {
    scope: String,
    storage: String,
    marker: Option<String>,
    updated_at: Option<String>,
    strategy_version: Option<String>,
    locked: bool,
    counter: u64,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl StatusArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let scope = self.scope.resolve()?;
        let status = collect(home, &scope)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("failed to serialize status")?
            );
            return Ok(());
        }
        print_table(&status);
        Ok(())
    }
}

fn collect(home: &Path, scope: &ScopeId) -> Result<ScopeStatus> {
    let dir = paths::scope_dir(home, scope);
    let state = ProgressTracker::for_scope(home, scope)
        .read()
        .with_context(|| format!("failed to read tracking state for {scope}"))?;
    let counter = Counter::in_scope(&dir)
        .read()
        .with_context(|| format!("failed to read counter for {scope}"))?;

    let initialized = state.is_initialized();
    Ok(ScopeStatus {
        scope: scope.to_string(),
        storage: dir.display().to_string(),
        marker: initialized.then(|| state.last_processed_marker.clone()),
        updated_at: initialized.then(|| state.updated_at.to_rfc3339()),
        strategy_version: (!state.strategy_version.is_empty())
            .then(|| state.strategy_version.clone()),
        locked: lock::is_locked(&dir),
        counter,
    })
}

fn print_table(status: &ScopeStatus) {
    let dash = || "-".to_string();
    let rows = vec![
        StatusRow {
            field: "scope",
            value: status.scope.clone(),
        },
        StatusRow {
            field: "storage",
            value: status.storage.clone(),
        },
        StatusRow {
            field: "marker",
            value: status.marker.clone().unwrap_or_else(dash),
        },
        StatusRow {
            field: "updated",
            value: status.updated_at.clone().unwrap_or_else(dash),
        },
        StatusRow {
            field: "strategy",
            value: status.strategy_version.clone().unwrap_or_else(dash),
        },
        StatusRow {
            field: "locked",
            value: if status.locked {
                "yes".red().to_string()
            } else {
                "no".green().to_string()
            },
        },
        StatusRow {
            field: "counter",
            value: status.counter.to_string(),
        },
    ];

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if status.marker.is_none() {
        println!("{}", "Not tracked yet; the first trigger initializes it.".dimmed());
    }
}
