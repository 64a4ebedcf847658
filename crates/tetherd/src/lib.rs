//! Process lifecycle control for long-running workers.
//!
//! A program embeds a [`Lifecycle`] around its worker callback and gains the
//! usual daemon verbs: `start` (foreground or detached), `stop`, `restart`,
//! `reload` and `status`. State lives in a PID marker file whose content is
//! the decimal pid of the worker; every operation re-derives the worker's
//! state from that marker and a zero-signal liveness probe.
//!
//! Detaching re-executes the program's own binary with `TETHER_DAEMON=1` in
//! its environment, output appended to the log sink, and a fresh session.
//! The re-executed child detects its role and runs the worker in place.
//!
//! While the worker runs, SIGTERM and SIGINT request termination through the
//! [`Shutdown`] token passed to the worker, SIGHUP invokes the reload hook,
//! and the marker is removed once the worker finishes. A worker that ignores
//! the token is cut off after the configured grace period.

mod process;
pub mod telemetry;

pub use process::{
    CompletionReason, ControlSignal, DaemonizeError, Daemonizer, Hook, Lifecycle, LifecycleError,
    POLL_INTERVAL, PidFileError, PidFileStore, ProcessProbe, ProcessRole, ProcessState,
    ReloadOutcome, RouterError, SelfExecDaemonizer, Shutdown, SignalError, SignalSource,
    SignalStream, StartOutcome, StartRequest, StatusReport, StopOutcome, Subscription,
    SystemSignalSource, Worker,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
