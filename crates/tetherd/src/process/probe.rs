//! Liveness checks and signal delivery against OS process ids.
//!
//! The tracked pid is not necessarily a child of the caller (a fresh `stop`
//! invocation targets a process daemonised earlier), so waiting is done by
//! polling the zero-signal probe rather than `waitpid(2)`.

use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::PROCESS_TARGET;
use super::errors::SignalError;

/// Interval between liveness probes while waiting for an exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Probes and signals processes by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessProbe {
    interval: Duration,
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe {
    /// Builds a probe polling at [`POLL_INTERVAL`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interval: POLL_INTERVAL,
        }
    }

    /// Builds a probe polling at a custom interval.
    #[must_use]
    pub const fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Reports whether `pid` names an existing process.
    ///
    /// Permission errors mean the process exists under another user and count
    /// as alive. Zombies still count as alive until their parent reaps them.
    pub fn is_alive(&self, pid: u32) -> bool {
        let Ok(target) = os_pid(pid) else {
            return false;
        };
        match kill(target, None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(Errno::ESRCH) => false,
            Err(errno) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid,
                    error = %errno,
                    "unexpected liveness probe failure; treating process as gone"
                );
                false
            }
        }
    }

    /// Polls until `pid` disappears or `timeout` elapses.
    ///
    /// Returns `true` once the process is gone and `false` on timeout. A
    /// timeout too large to represent as a deadline waits without bound.
    pub fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if !self.is_alive(pid) {
                return true;
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(
                            target: PROCESS_TARGET,
                            pid,
                            timeout_ms = timeout.as_millis(),
                            "process still alive after wait"
                        );
                        return false;
                    }
                    self.interval.min(deadline - now)
                }
                None => self.interval,
            };
            thread::sleep(pause);
        }
    }

    /// Delivers `signal` to `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidPid`] for pids that would address a
    /// process group, [`SignalError::TargetNotFound`] when the process no
    /// longer exists, and [`SignalError::Delivery`] for other refusals such
    /// as `EPERM`.
    pub fn signal(&self, pid: u32, signal: Signal) -> Result<(), SignalError> {
        let target = os_pid(pid)?;
        match kill(target, signal) {
            Ok(()) => {
                debug!(
                    target: PROCESS_TARGET,
                    pid,
                    signal = signal.as_str(),
                    "signal delivered"
                );
                Ok(())
            }
            Err(Errno::ESRCH) => Err(SignalError::TargetNotFound { pid }),
            Err(source) => Err(SignalError::Delivery {
                pid,
                signal: signal.as_str(),
                source,
            }),
        }
    }
}

fn os_pid(pid: u32) -> Result<Pid, SignalError> {
    if pid == 0 {
        return Err(SignalError::InvalidPid {
            pid,
            reason: "pid 0 addresses the caller's process group",
        });
    }
    let raw = i32::try_from(pid).map_err(|_| SignalError::InvalidPid {
        pid,
        reason: "pid exceeds the platform's signed pid range",
    })?;
    Ok(Pid::from_raw(raw))
}
