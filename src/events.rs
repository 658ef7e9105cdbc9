//! Event logging for stage invocations.
//!
//! Execution events are appended to an NDJSON file (one JSON object per line)
//! so runs can be audited after the fact. Logging is optional and never
//! changes the outcome of an invocation.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: `exec_start` or `exec_complete`
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `details`: Freeform object with action-specific details
//!
//! # Usage
//!
//! ```no_run
//! use execstage::events::{Event, EventAction, EventLog};
//! use serde_json::json;
//!
//! let log = EventLog::new("/tmp/execstage.ndjson");
//! let event = Event::new(EventAction::ExecStart).with_details(json!({"command": "ls -l ."}));
//! log.append(&event)?;
//! # Ok::<(), execstage::error::StageError>(())
//! ```

use crate::error::{Result, StageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// An invocation started.
    ExecStart,
    /// An invocation produced its outcome.
    ExecComplete,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::ExecStart => write!(f, "exec_start"),
            EventAction::ExecComplete => write!(f, "exec_complete"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Who ran the stage (e.g., `user@HOST`).
    pub actor: String,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, stamped now.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| StageError::Io(format!("failed to serialize event to JSON: {}", e)))
    }
}

fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append-only NDJSON event file.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event as one line, creating the file and its parent directory if needed.
    pub fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    StageError::Io(format!(
                        "failed to create events directory '{}': {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                StageError::Io(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            StageError::Io(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            StageError::Io(format!(
                "failed to sync events file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Append, downgrading any failure to a warning.
    pub fn record(&self, event: &Event) {
        if let Err(e) = self.append(event) {
            tracing::warn!(action = %event.action, error = %e, "failed to log event");
        }
    }
}
