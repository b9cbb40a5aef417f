//! `docsync hook` — session-progress trigger, fed the hook payload on stdin.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use docsync_core::{config, UpdateResult};
use docsync_sync::{
    run_session_progress, tool_response_succeeded, InvocationContext, Invoker, ProcessGenerator,
    SessionTrigger, SkipEnvironment,
};

use crate::envelope::Envelope;

const DEFAULT_EVENT: &str = "PostToolUse";

/// Arguments for `docsync hook`.
#[derive(Args, Debug)]
pub struct HookArgs {}

/// Fields of the hook payload docsync reads; everything else is ignored.
#[derive(Debug, Deserialize)]
struct HookPayload {
    session_id: String,
    transcript_path: PathBuf,
    #[serde(default)]
    cwd: Option<PathBuf>,
    #[serde(default)]
    hook_event_name: Option<String>,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    tool_response: Option<serde_json::Value>,
}

impl HookArgs {
    /// Always succeeds: failures are reported in the envelope, never through
    /// the exit code, so the calling tool is never blocked.
    pub fn run(self, home: &Path) -> Result<()> {
        let mut raw = String::new();
        let (event, result) = match std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read hook payload from stdin")
            .and_then(|_| parse_payload(&raw))
        {
            Ok(payload) => {
                let event = payload
                    .hook_event_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EVENT.to_string());
                let result = handle(home, payload).unwrap_or_else(|e| {
                    tracing::error!(error = %format!("{e:#}"), "hook failed");
                    UpdateResult::error(format!("{e:#}"))
                });
                (event, result)
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "invalid hook payload");
                (DEFAULT_EVENT.to_string(), UpdateResult::error(format!("{e:#}")))
            }
        };

        Envelope::new(event, result).print();
        Ok(())
    }
}

fn parse_payload(raw: &str) -> Result<HookPayload> {
    serde_json::from_str(raw).context("hook payload is not valid JSON")
}

fn handle(home: &Path, payload: HookPayload) -> Result<UpdateResult> {
    let config = config::load_at(home).context("failed to load config")?;
    let project_dir = match payload.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("could not determine current directory")?,
    };
    let trigger = SessionTrigger {
        session_id: payload.session_id,
        transcript_path: payload.transcript_path,
        project_dir,
        tool_name: payload.tool_name,
        tool_succeeded: payload
            .tool_response
            .as_ref()
            .map_or(true, tool_response_succeeded),
    };

    let generator = ProcessGenerator::from_config(&config.generator);
    let invoker = Invoker::new(&generator, InvocationContext::from_env());
    Ok(run_session_progress(
        home,
        &config,
        &trigger,
        invoker,
        SkipEnvironment::from_env(&config.skip),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_ignores_unknown_fields() {
        let payload = parse_payload(
            r#"{"session_id":"s1","transcript_path":"/t.jsonl","cwd":"/code","hook_event_name":"PostToolUse","tool_name":"Edit","tool_input":{"file_path":"x"},"tool_response":{"success":true}}"#,
        )
        .unwrap();
        assert_eq!(payload.session_id, "s1");
        assert_eq!(payload.tool_name.as_deref(), Some("Edit"));
        assert_eq!(payload.cwd, Some(PathBuf::from("/code")));
        assert_eq!(
            payload.tool_response,
            Some(serde_json::json!({"success": true}))
        );
    }

    #[test]
    fn payload_requires_session_and_transcript() {
        assert!(parse_payload(r#"{"session_id":"s1"}"#).is_err());
    }
}
