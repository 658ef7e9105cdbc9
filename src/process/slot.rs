//! Shared slot holding the live child process.
//!
//! The invocation thread and any number of cancelling threads meet here. All
//! state lives behind one mutex, and the lock is never held across a blocking
//! call: only `try_wait` and `kill` run under it.
//!
//! A cancel request that arrives while the slot is `Spawning` is recorded and
//! applied the moment the child is published. A request that arrives while
//! the slot is `Idle` or already terminal is ignored.

use std::io;
use std::process::{Child, ExitStatus};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lifecycle of the process behind a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No invocation in progress.
    #[default]
    Idle,
    /// An invocation has begun but no process exists yet.
    Spawning,
    /// The process is published and running.
    Running,
    /// The process exited on its own.
    Completed,
    /// The process was killed by a cancel request.
    Killed,
    /// The process was never created.
    SpawnFailed,
}

#[derive(Debug, Default)]
struct SlotState {
    phase: Phase,
    cancel_requested: bool,
    child: Option<Child>,
}

/// How a reaped child ended.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reaped {
    pub status: ExitStatus,
    pub killed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ProcessSlot {
    state: Mutex<SlotState>,
}

impl ProcessSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Idle -> Spawning. Clears anything left from a previous invocation.
    pub fn begin(&self) {
        let mut state = self.lock();
        state.phase = Phase::Spawning;
        state.cancel_requested = false;
        state.child = None;
    }

    /// Spawning -> SpawnFailed.
    pub fn spawn_failed(&self) {
        self.lock().phase = Phase::SpawnFailed;
    }

    /// Spawning -> Running, or straight to Killed if a cancel is pending.
    ///
    /// Returns true if the child was killed on publication.
    pub fn publish(&self, mut child: Child) -> bool {
        let mut state = self.lock();
        let killed = state.cancel_requested && kill(&mut child).is_ok();
        if killed {
            tracing::debug!(pid = child.id(), "applying cancel requested before spawn");
            state.phase = Phase::Killed;
        } else {
            state.phase = Phase::Running;
        }
        state.child = Some(child);
        killed
    }

    /// Non-blocking check for exit. Reaps and releases the child once it is gone.
    pub fn poll(&self) -> io::Result<Option<Reaped>> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(child) = state.child.as_mut() else {
            return Err(io::Error::other("no child process published"));
        };

        match child.try_wait()? {
            Some(status) => {
                let killed = state.phase == Phase::Killed;
                if !killed {
                    state.phase = Phase::Completed;
                }
                state.child = None;
                Ok(Some(Reaped { status, killed }))
            }
            None => Ok(None),
        }
    }

    /// Request cancellation. Never blocks on the invocation thread.
    pub fn cancel(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;

        match state.phase {
            Phase::Spawning => {
                tracing::debug!("cancel requested before process published; deferring");
                state.cancel_requested = true;
            }
            Phase::Running => {
                let Some(child) = state.child.as_mut() else {
                    return;
                };
                // An exited but unreaped child is a natural exit, not a kill.
                if let Ok(Some(_)) = child.try_wait() {
                    return;
                }
                match kill(child) {
                    Ok(()) => {
                        tracing::info!(pid = child.id(), "process killed by cancel request");
                        state.phase = Phase::Killed;
                    }
                    Err(e) => {
                        tracing::warn!(pid = child.id(), error = %e, "failed to kill process");
                    }
                }
            }
            Phase::Idle | Phase::Completed | Phase::Killed | Phase::SpawnFailed => {}
        }
    }

    /// Any state -> Idle. Kills and reaps a child that is somehow still live.
    pub fn finish(&self) {
        let mut state = self.lock();
        if let Some(mut child) = state.child.take() {
            tracing::warn!(pid = child.id(), "invocation ended with live process; killing");
            let _ = kill(&mut child);
            let _ = child.wait();
        }
        state.phase = Phase::Idle;
        state.cancel_requested = false;
    }
}

/// Kill the child together with its process group, if it leads one.
///
/// Falls back to killing the child alone when there is no such group.
fn kill(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let pgid = Pid::from_raw(child.id() as i32);
        if killpg(pgid, Signal::SIGKILL).is_ok() {
            return Ok(());
        }
    }
    child.kill()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};

    fn spawn(args: &[&str]) -> Child {
        Command::new(args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    fn reap(slot: &ProcessSlot) -> Reaped {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(reaped) = slot.poll().unwrap() {
                return reaped;
            }
            assert!(Instant::now() < deadline, "child did not exit");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_default_phase_is_idle() {
        assert_eq!(ProcessSlot::default().phase(), Phase::Idle);
    }

    #[test]
    fn test_cancel_while_idle_is_forgotten() {
        let slot = ProcessSlot::default();
        slot.cancel();
        slot.begin();
        assert!(!slot.publish(spawn(&["true"])));
        let reaped = reap(&slot);
        assert!(!reaped.killed);
        assert!(reaped.status.success());
        assert_eq!(slot.phase(), Phase::Completed);
    }

    #[test]
    fn test_pending_cancel_applied_on_publish() {
        let slot = ProcessSlot::default();
        slot.begin();
        slot.cancel();
        slot.cancel();
        assert_eq!(slot.phase(), Phase::Spawning);

        assert!(slot.publish(spawn(&["sleep", "5"])));
        assert_eq!(slot.phase(), Phase::Killed);
        let reaped = reap(&slot);
        assert!(reaped.killed);
        assert!(!reaped.status.success());
    }

    #[test]
    fn test_cancel_running_process() {
        let slot = ProcessSlot::default();
        slot.begin();
        slot.publish(spawn(&["sleep", "5"]));
        assert_eq!(slot.phase(), Phase::Running);

        slot.cancel();
        assert_eq!(slot.phase(), Phase::Killed);
        assert!(reap(&slot).killed);
    }

    #[test]
    fn test_cancel_kills_process_group() {
        use std::os::unix::process::CommandExt;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let marker = temp_dir.path().join("survived");
        let script = format!("(sleep 1; touch '{}') & wait", marker.display());
        let child = Command::new("sh")
            .args(["-c", &script])
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let slot = ProcessSlot::default();
        slot.begin();
        slot.publish(child);
        thread::sleep(Duration::from_millis(100));
        slot.cancel();
        assert!(reap(&slot).killed);

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let slot = ProcessSlot::default();
        slot.begin();
        slot.publish(spawn(&["true"]));
        reap(&slot);

        slot.cancel();
        assert_eq!(slot.phase(), Phase::Completed);
    }

    #[test]
    fn test_cancel_after_unreaped_exit_is_not_a_kill() {
        let slot = ProcessSlot::default();
        slot.begin();
        slot.publish(spawn(&["true"]));
        thread::sleep(Duration::from_millis(200));

        slot.cancel();
        let reaped = reap(&slot);
        assert!(!reaped.killed);
        assert!(reaped.status.success());
    }

    #[test]
    fn test_finish_resets_and_kills_leftover() {
        let slot = ProcessSlot::default();
        slot.begin();
        slot.publish(spawn(&["sleep", "5"]));

        let start = Instant::now();
        slot.finish();
        assert!(start.elapsed() < Duration::from_secs(4));
        assert_eq!(slot.phase(), Phase::Idle);

        slot.cancel();
        assert_eq!(slot.phase(), Phase::Idle);
    }

    #[test]
    fn test_spawn_failed_ignores_cancel() {
        let slot = ProcessSlot::default();
        slot.begin();
        slot.spawn_failed();
        slot.cancel();
        assert_eq!(slot.phase(), Phase::SpawnFailed);
        assert!(slot.poll().is_err());
    }
}
