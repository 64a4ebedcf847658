//! Describes how the current process was launched and what a start asks for.

use std::env;

use tether_config::{DAEMON_ENV_VALUE, DAEMON_ENV_VAR};

/// Role of the running process in a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessRole {
    /// Invoked by an operator; dispatches work or runs it in the foreground.
    #[default]
    Controller,
    /// Re-executed by the daemoniser and expected to run the worker.
    DaemonChild,
}

impl ProcessRole {
    /// Inspects the environment for the daemon marker.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_marker(env::var_os(DAEMON_ENV_VAR).as_deref().and_then(|v| v.to_str()))
    }

    fn from_marker(value: Option<&str>) -> Self {
        match value {
            Some(DAEMON_ENV_VALUE) => Self::DaemonChild,
            _ => Self::Controller,
        }
    }

    /// Whether this process is the re-executed daemon child.
    #[must_use]
    pub const fn is_daemon_child(self) -> bool {
        matches!(self, Self::DaemonChild)
    }
}

/// Parameters for [`Lifecycle::start`](super::Lifecycle::start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartRequest {
    /// Detach into a daemon child instead of running the worker here.
    pub daemonize: bool,
}

impl StartRequest {
    /// Runs the worker attached to the calling process.
    #[must_use]
    pub const fn foreground() -> Self {
        Self { daemonize: false }
    }

    /// Detaches the worker into a background daemon.
    #[must_use]
    pub const fn daemon() -> Self {
        Self { daemonize: true }
    }
}
