//! Implementation of the `execstage run` command.
//!
//! Resolves the configured command, runs it once and maps the outcome to the
//! process exit code. With `--cancel-after` a watcher thread stops the
//! command through the stage's cancel handle, the same way an owning
//! workflow would.

use crate::cli::RunArgs;
use crate::commands::build_config;
use execstage::config::Config;
use execstage::error::Result;
use execstage::events::{Event, EventAction, EventLog};
use execstage::exit_codes;
use execstage::process::Phase;
use execstage::{CancelHandle, ExecStage, ExecutionResult, PlaceholderRegistry, VariableStore};
use serde_json::json;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Build a stage backed by the config's variables and placeholders.
pub(crate) fn stage_from(config: &Config) -> ExecStage<VariableStore, PlaceholderRegistry> {
    ExecStage::new(config.variable_store(), config.placeholder_registry())
}

/// Execute the `execstage run` command.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let config = build_config(&args.stage)?;
    let overlay = config.overlay()?;
    let cwd = config.working_directory();
    let events = args
        .events
        .clone()
        .or_else(|| config.events_path())
        .map(EventLog::new);

    let mut stage = stage_from(&config);
    let template = config.template();

    // Dropped when this function returns, which releases the canceller.
    let (_done, done_rx) = mpsc::channel::<()>();
    if let Some(secs) = args.cancel_after {
        spawn_canceller(stage.cancel_handle(), Duration::from_secs(secs), done_rx);
    }

    if let Some(log) = &events {
        log.record(&Event::new(EventAction::ExecStart).with_details(json!({
            "command": template.raw(),
            "working_directory": cwd.as_ref().map(|p| p.display().to_string()),
            "env_overlay": overlay.len(),
        })));
    }

    let start_time = Instant::now();
    let result = stage.execute(&template, &overlay, cwd.as_deref());
    let duration_ms = start_time.elapsed().as_millis() as u64;

    if let Some(log) = &events {
        log.record(&completion_event(&result, duration_ms));
    }

    result.into_result()
}

/// How often the canceller checks whether the invocation has begun.
const START_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Cancel the stage's invocation once it has been running for `delay`.
///
/// The delay starts when the invocation begins, so the cancel is never
/// dropped on an idle slot. The thread exits without cancelling as soon as
/// `done` disconnects.
fn spawn_canceller(handle: CancelHandle, delay: Duration, done: Receiver<()>) -> JoinHandle<()> {
    thread::spawn(move || {
        while handle.phase() == Phase::Idle {
            if let Err(TryRecvError::Disconnected) = done.try_recv() {
                return;
            }
            thread::sleep(START_POLL_INTERVAL);
        }

        if let Err(RecvTimeoutError::Timeout) = done.recv_timeout(delay) {
            tracing::info!(after_secs = delay.as_secs(), "cancelling command");
            handle.cancel();
        }
    })
}

fn completion_event(result: &ExecutionResult, duration_ms: u64) -> Event {
    let details = match result.error() {
        None => json!({
            "success": true,
            "exit_code": exit_codes::SUCCESS,
            "duration_ms": duration_ms,
        }),
        Some(err) => json!({
            "success": false,
            "exit_code": err.exit_code(),
            "kind": err.kind(),
            "duration_ms": duration_ms,
        }),
    };
    Event::new(EventAction::ExecComplete).with_details(details)
}
