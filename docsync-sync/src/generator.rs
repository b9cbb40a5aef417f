//! Generator invocation with recursion protection.
//!
//! The generator is an external program called as
//! `<program> <args...> <prompt> [--model <name>]`. Every child gets
//! [`GUARD_ENV`]`=1` in its environment; a docsync process started beneath a
//! generator (e.g. by a hook the generator itself fires) sees the marker and
//! refuses to invoke again.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use docsync_core::config::GeneratorConfig;

use crate::error::SyncError;

/// Environment marker inherited by every generator process.
pub const GUARD_ENV: &str = "DOCSYNC_GENERATOR_ACTIVE";

// ---------------------------------------------------------------------------
// Context & invocation
// ---------------------------------------------------------------------------

/// Whether the current process runs beneath a generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub inside_generator: bool,
}

impl InvocationContext {
    /// Read [`GUARD_ENV`]. Call only at the process boundary.
    pub fn from_env() -> Self {
        Self {
            inside_generator: std::env::var_os(GUARD_ENV).is_some_and(|v| !v.is_empty()),
        }
    }
}

/// One generator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub prompt: String,
    pub model: Option<String>,
    /// Working directory of the child.
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(prompt: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            cwd: cwd.into(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// Captured output of a synchronous call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Seam over the external generator.
pub trait Generator {
    /// Start the generator in its own process group and return immediately.
    fn launch_detached(&self, invocation: &Invocation) -> Result<(), SyncError>;

    /// Run the generator and wait for it to exit.
    fn run_to_completion(&self, invocation: &Invocation) -> Result<GeneratorOutput, SyncError>;
}

// ---------------------------------------------------------------------------
// ProcessGenerator
// ---------------------------------------------------------------------------

/// [`Generator`] backed by a real child process.
#[derive(Debug, Clone)]
pub struct ProcessGenerator {
    program: String,
    args: Vec<String>,
}

impl ProcessGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(&invocation.prompt);
        if let Some(model) = &invocation.model {
            cmd.arg("--model").arg(model);
        }
        cmd.current_dir(&invocation.cwd).env(GUARD_ENV, "1");
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> SyncError {
        SyncError::GeneratorSpawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl Generator for ProcessGenerator {
    fn launch_detached(&self, invocation: &Invocation) -> Result<(), SyncError> {
        let mut cmd = self.command(invocation);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut cmd);

        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        tracing::info!(
            program = %self.program,
            pid = child.id(),
            cwd = %invocation.cwd.display(),
            "generator launched in background"
        );
        Ok(())
    }

    fn run_to_completion(&self, invocation: &Invocation) -> Result<GeneratorOutput, SyncError> {
        let output = self
            .command(invocation)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(SyncError::GeneratorFailed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(GeneratorOutput { stdout, stderr })
    }
}

/// Put the child of `cmd` in its own process group so it outlives the caller.
#[cfg(unix)]
pub fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
pub fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
    const DETACHED_PROCESS: u32 = 0x00000008;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS);
}

#[cfg(not(any(unix, windows)))]
pub fn detach(_cmd: &mut Command) {}

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

/// What happened to a background submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Launched,
    /// Inside a generator already; nothing was started.
    Suppressed,
}

/// Applies the recursion guard in front of a [`Generator`].
pub struct Invoker<'a> {
    generator: &'a dyn Generator,
    context: InvocationContext,
}

impl<'a> Invoker<'a> {
    pub fn new(generator: &'a dyn Generator, context: InvocationContext) -> Self {
        Self { generator, context }
    }

    /// Submit-and-forget. Silently suppressed under the recursion guard.
    pub fn submit(&self, invocation: &Invocation) -> Result<Submission, SyncError> {
        if self.context.inside_generator {
            tracing::debug!(cwd = %invocation.cwd.display(), "recursion guard: background generator suppressed");
            return Ok(Submission::Suppressed);
        }
        self.generator.launch_detached(invocation)?;
        Ok(Submission::Launched)
    }

    /// Run to completion. An error under the recursion guard.
    pub fn run(&self, invocation: &Invocation) -> Result<GeneratorOutput, SyncError> {
        if self.context.inside_generator {
            return Err(SyncError::RecursionGuard);
        }
        self.generator.run_to_completion(invocation)
    }
}

/// Working directory for an artifact's generator call.
pub fn artifact_cwd(artifact: &Path, fallback: &Path) -> PathBuf {
    artifact
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(fallback)
        .to_path_buf()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
