//! Defines the unified error surface for lifecycle operations.

use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use thiserror::Error;

/// Errors raised by the PID marker store.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The marker does not exist.
    #[error("pid file '{path}' does not exist")]
    NotFound {
        /// Marker path.
        path: Utf8PathBuf,
    },
    /// The marker exists but does not hold a usable process id.
    #[error("pid file '{path}' holds invalid content {content:?}")]
    Corrupt {
        /// Marker path.
        path: Utf8PathBuf,
        /// Raw content, trimmed.
        content: String,
    },
    /// Exclusive creation found an existing marker.
    #[error("pid file '{path}' already exists")]
    AlreadyExists {
        /// Marker path.
        path: Utf8PathBuf,
    },
    /// The marker's parent directory could not be created.
    #[error("failed to create pid directory '{path}': {source}")]
    Directory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the marker failed.
    #[error("failed to read pid file '{path}': {source}")]
    Read {
        /// Marker path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the marker failed.
    #[error("failed to write pid file '{path}': {source}")]
    Write {
        /// Marker path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing the marker failed.
    #[error("failed to remove pid file '{path}': {source}")]
    Remove {
        /// Marker path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while delivering a signal to a tracked process.
#[derive(Debug, Error)]
pub enum SignalError {
    /// The process id no longer exists.
    #[error("process {pid} does not exist")]
    TargetNotFound {
        /// Target pid.
        pid: u32,
    },
    /// The pid cannot be addressed safely.
    #[error("refusing to signal pid {pid}: {reason}")]
    InvalidPid {
        /// Rejected pid.
        pid: u32,
        /// Why the pid was rejected.
        reason: &'static str,
    },
    /// The kernel refused delivery.
    #[error("failed to send {signal} to process {pid}: {source}")]
    Delivery {
        /// Target pid.
        pid: u32,
        /// Signal name.
        signal: &'static str,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// The log sink could not be created or opened for appending.
    #[error("failed to open log file '{path}': {source}")]
    LogSink {
        /// Log sink path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The program could not be re-executed.
    #[error("failed to spawn daemon '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The running executable could not be located.
    #[error("failed to resolve the current executable: {source}")]
    CurrentExe {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors reported while installing the signal router.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The dispatch thread could not be started.
    #[error("failed to start signal dispatch thread: {source}")]
    Thread {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors returned by the five lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The marker was required but is absent.
    #[error("pid file '{path}' not found; is the process running?")]
    NotFound {
        /// Marker path.
        path: Utf8PathBuf,
    },
    /// The marker content is unparsable.
    #[error("pid file '{path}' is corrupt (content {content:?})")]
    Corrupt {
        /// Marker path.
        path: Utf8PathBuf,
        /// Raw content, trimmed.
        content: String,
    },
    /// A filesystem operation on the marker failed.
    #[error(transparent)]
    PidFile(PidFileError),
    /// Launching the daemon child failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[source]
        source: DaemonizeError,
    },
    /// The recorded pid no longer corresponds to a live process.
    #[error("process {pid} is not running (stale pid file)")]
    TargetNotFound {
        /// Recorded pid.
        pid: u32,
    },
    /// A signal could not be delivered.
    #[error(transparent)]
    Signal(SignalError),
    /// A live process already owns the marker.
    #[error("process already running with pid {pid}")]
    AlreadyRunning {
        /// Pid recorded in the marker.
        pid: u32,
    },
    /// Installing the signal router failed.
    #[error("failed to set up signal handling: {source}")]
    SignalRouter {
        /// Underlying router error.
        #[source]
        source: RouterError,
    },
}

impl From<PidFileError> for LifecycleError {
    fn from(source: PidFileError) -> Self {
        match source {
            PidFileError::NotFound { path } => Self::NotFound { path },
            PidFileError::Corrupt { path, content } => Self::Corrupt { path, content },
            other => Self::PidFile(other),
        }
    }
}

impl From<SignalError> for LifecycleError {
    fn from(source: SignalError) -> Self {
        match source {
            SignalError::TargetNotFound { pid } => Self::TargetNotFound { pid },
            other => Self::Signal(other),
        }
    }
}

impl From<DaemonizeError> for LifecycleError {
    fn from(source: DaemonizeError) -> Self {
        Self::Daemonize { source }
    }
}

impl From<RouterError> for LifecycleError {
    fn from(source: RouterError) -> Self {
        Self::SignalRouter { source }
    }
}
