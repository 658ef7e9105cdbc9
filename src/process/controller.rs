//! Process execution with cross-thread cancellation.
//!
//! Runs one argument vector to completion, capturing stdout and stderr in
//! memory, and classifies the outcome. A [`CancelHandle`] obtained from the
//! controller may be used from any thread to kill the running process.

use super::slot::{Phase, ProcessSlot, Reaped};
use crate::env::EnvMap;
use crate::error::{Result, StageError};
use crate::outcome::ExecutionResult;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// How often the invocation thread checks whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to keep reading output after a kill before giving up on the pipes.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Owns the process slot for one stage. At most one invocation runs at a time.
#[derive(Debug, Default)]
pub struct ProcessController {
    slot: Arc<ProcessSlot>,
}

/// Cloneable, thread-safe handle for cancelling a controller's invocation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    slot: Arc<ProcessSlot>,
}

impl CancelHandle {
    /// Kill the running process, or remember the request if it is still being spawned.
    ///
    /// Safe to call any number of times, from any thread, at any time.
    pub fn cancel(&self) {
        self.slot.cancel();
    }

    pub fn phase(&self) -> Phase {
        self.slot.phase()
    }
}

impl ProcessController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    pub fn cancel(&self) {
        self.slot.cancel();
    }

    pub fn phase(&self) -> Phase {
        self.slot.phase()
    }

    /// Start an invocation. Cancel requests from here on are not lost.
    pub fn begin(&mut self) -> Invocation<'_> {
        self.slot.begin();
        Invocation { slot: &self.slot }
    }

    /// Shorthand for `begin().run(..)`.
    pub fn run(&mut self, argv: &[String], env: &EnvMap, cwd: Option<&Path>) -> ExecutionResult {
        self.begin().run(argv, env, cwd)
    }
}

/// An in-flight invocation. Dropping it returns the controller to idle.
#[derive(Debug)]
pub struct Invocation<'a> {
    slot: &'a ProcessSlot,
}

impl Invocation<'_> {
    /// Spawn `argv` with exactly `env` as its environment and wait for it.
    ///
    /// An empty `cwd` path is treated like `None` (inherit the caller's directory).
    pub fn run(self, argv: &[String], env: &EnvMap, cwd: Option<&Path>) -> ExecutionResult {
        self.execute(argv, env, cwd).into()
    }

    fn execute(&self, argv: &[String], env: &EnvMap, cwd: Option<&Path>) -> Result<()> {
        let cwd = cwd.filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = cwd {
            if !dir.is_dir() {
                self.slot.spawn_failed();
                return Err(StageError::WorkingDirectory(dir.to_path_buf()));
            }
        }

        let Some((program, args)) = argv.split_first() else {
            self.slot.spawn_failed();
            return Err(StageError::EmptyCommand(String::new()));
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        // Own process group, so a cancel reaches everything the command forks.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let start_time = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                self.slot.spawn_failed();
                return Err(StageError::Spawn {
                    command: shell_words::join(argv),
                    source,
                });
            }
        };

        let pid = child.id();
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        tracing::debug!(pid, program = %program, "process started");
        self.slot.publish(child);

        let reaped = self.wait()?;
        // A descendant outside the process group may still hold the pipes open.
        let deadline = reaped.killed.then(|| Instant::now() + KILL_DRAIN_GRACE);
        let stdout = collect(stdout_reader, deadline);
        let stderr = collect(stderr_reader, deadline);

        tracing::debug!(
            pid,
            code = ?reaped.status.code(),
            killed = reaped.killed,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "process finished"
        );

        if reaped.killed {
            return Err(StageError::Cancelled { stdout, stderr });
        }
        if !reaped.status.success() {
            return Err(StageError::NonZeroExit {
                code: reaped.status.code(),
                stdout,
                stderr,
            });
        }
        Ok(())
    }

    fn wait(&self) -> Result<Reaped> {
        loop {
            match self.slot.poll() {
                Ok(Some(reaped)) => return Ok(reaped),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(StageError::Wait(e)),
            }
        }
    }
}

impl Drop for Invocation<'_> {
    fn drop(&mut self) {
        self.slot.finish();
    }
}

/// Read a pipe to the end on its own thread so the child never blocks on a full pipe.
fn drain<R>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Wait for a reader's output. With a deadline, a reader still blocked at
/// that point is abandoned and its output dropped.
fn collect(reader: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> String {
    let Some(rx) = reader else {
        return String::new();
    };
    let buf = match deadline {
        Some(deadline) => rx
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .ok(),
        None => rx.recv().ok(),
    };
    buf.map(|buf| String::from_utf8_lossy(&buf).into_owned()).unwrap_or_default()
}
