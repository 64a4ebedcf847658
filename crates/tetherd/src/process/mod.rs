mod controller;
mod daemonizer;
mod errors;
mod guard;
mod launch;
mod pid_file;
mod probe;
mod report;
mod shutdown;
mod signals;

pub use controller::{Lifecycle, Worker};
pub use daemonizer::{Daemonizer, SelfExecDaemonizer};
pub use errors::{DaemonizeError, LifecycleError, PidFileError, RouterError, SignalError};
pub use launch::{ProcessRole, StartRequest};
pub use pid_file::PidFileStore;
pub use probe::{POLL_INTERVAL, ProcessProbe};
pub use report::{
    CompletionReason, ProcessState, ReloadOutcome, StartOutcome, StatusReport, StopOutcome,
};
pub use shutdown::Shutdown;
pub use signals::{
    ControlSignal, Hook, SignalSource, SignalStream, Subscription, SystemSignalSource,
};

#[cfg(test)]
pub(crate) use signals::ExitHook;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
