//! Results returned by the lifecycle operations.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

/// Believed state of the tracked process, derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// No marker exists.
    Stopped,
    /// The marker records a live process.
    Running {
        /// Recorded pid.
        pid: u32,
    },
    /// The marker exists but no live process backs it.
    Stale {
        /// Recorded pid, absent when the marker content is unusable.
        pid: Option<u32>,
    },
}

impl ProcessState {
    /// Pid recorded in the marker, if one could be read.
    #[must_use]
    pub const fn pid(self) -> Option<u32> {
        match self {
            Self::Stopped => None,
            Self::Running { pid } => Some(pid),
            Self::Stale { pid } => pid,
        }
    }

    /// Whether the tracked process is alive.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Running { .. } => f.write_str("running"),
            Self::Stale { .. } => f.write_str("stopped (stale PID file)"),
        }
    }
}

/// Output of [`Lifecycle::status`](super::Lifecycle::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Classification of the marker.
    pub state: ProcessState,
    /// Marker location.
    pub pid_file: Utf8PathBuf,
    /// Log sink location.
    pub log_file: Utf8PathBuf,
}

/// Why a worker run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// The worker returned without a termination request.
    WorkerReturned,
    /// A termination signal was received and the worker honoured it.
    Terminated {
        /// Raw signal number.
        signal: i32,
    },
}

/// Output of [`Lifecycle::start`](super::Lifecycle::start) and
/// [`Lifecycle::restart`](super::Lifecycle::restart).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A daemon child was launched and the caller should exit.
    Detached {
        /// Child pid.
        pid: u32,
        /// Where the child writes its output.
        log_file: Utf8PathBuf,
    },
    /// The worker ran in this process and has finished.
    Completed {
        /// Pid that ran the worker.
        pid: u32,
        /// Why the run ended.
        reason: CompletionReason,
    },
}

impl StartOutcome {
    pub(crate) fn detached(pid: u32, log_file: &Utf8Path) -> Self {
        Self::Detached {
            pid,
            log_file: log_file.to_path_buf(),
        }
    }
}

/// Output of [`Lifecycle::stop`](super::Lifecycle::stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    /// Pid that received SIGTERM.
    pub pid: u32,
    /// Whether the process disappeared within the settle period.
    pub exited: bool,
    /// Whether `stop` itself deleted the marker.
    pub marker_removed: bool,
}

/// Output of [`Lifecycle::reload`](super::Lifecycle::reload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// Pid that received SIGHUP.
    pub pid: u32,
}
