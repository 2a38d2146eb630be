//! Action logging for tg commands.
//!
//! Every invocation appends one JSON line to `<project>/.taskmaster/action.log`
//! unless the `action-log` setting turns it off. Logging never fails the
//! command it records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::ResolvedConfig;

/// Log location relative to the project root.
pub const ACTION_LOG_FILE: &str = ".taskmaster/action.log";

/// Longest string argument kept verbatim.
const MAX_ARG_LEN: usize = 100;

/// A single action log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "move", "tags")
    pub command: String,

    /// Sanitized command arguments
    pub args: Value,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Stable error code when the command failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    pub duration_ms: u64,

    pub user: String,
}

/// Outcome of a command as seen by the log.
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    pub error: Option<String>,
    pub error_code: Option<String>,
}

impl ActionOutcome {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(error: &crate::Error) -> Self {
        Self {
            error: Some(error.to_string()),
            error_code: Some(error.code().to_string()),
        }
    }
}

/// Where the log for `project_root` lives.
pub fn log_path(project_root: &Path) -> PathBuf {
    project_root.join(ACTION_LOG_FILE)
}

/// Append an entry for `command` if the log is enabled.
///
/// Failures are reported through `tracing` and otherwise ignored.
pub fn log_action(config: &ResolvedConfig, command: &str, args: Value, outcome: ActionOutcome, duration_ms: u64) {
    if !config.action_log_enabled() {
        return;
    }

    let entry = ActionLogEntry {
        timestamp: Utc::now(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success: outcome.error.is_none(),
        error: outcome.error,
        error_code: outcome.error_code,
        duration_ms,
        user: current_user(),
    };

    let path = log_path(&config.project_root);
    if let Err(e) = append_entry(&path, &entry) {
        warn!(path = %path.display(), error = %e, "failed to write action log");
    }
}

fn append_entry(path: &Path, entry: &ActionLogEntry) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Read every entry back, skipping malformed lines.
pub fn read_entries(project_root: &Path) -> crate::Result<Vec<ActionLogEntry>> {
    let path = log_path(project_root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

/// Strip secrets and shorten values before they reach the log.
///
/// Keys that look like credentials are redacted, paths are reduced to their
/// file name, and long strings are truncated.
fn sanitize_args(args: &Value) -> Value {
    match args {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let lower = key.to_lowercase();
                    let secret = ["password", "token", "secret"].iter().any(|s| lower.contains(s));
                    let value = if secret {
                        Value::String("[REDACTED]".to_string())
                    } else {
                        sanitize_args(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_args).collect()),
        Value::String(s) => {
            let base = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s)
            } else {
                s.as_str()
            };
            if base.chars().count() > MAX_ARG_LEN {
                let head: String = base.chars().take(MAX_ARG_LEN - 3).collect();
                Value::String(format!("{}... ({} chars)", head, base.chars().count()))
            } else {
                Value::String(base.to_string())
            }
        }
        _ => args.clone(),
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
