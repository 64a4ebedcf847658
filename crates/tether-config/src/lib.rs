//! Lifecycle settings shared by the Tether controller and its front end.
//!
//! A [`Config`] is immutable once built: the embedding program starts from
//! [`Config::new`] (or [`Config::default`]), applies named options such as
//! [`Config::with_pid_file`], and may finally layer command-line overrides on
//! top with [`Config::apply_overrides`]. The controller never guesses paths
//! beyond the documented `./<program>.pid` and `./<program>.log` fallbacks.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;

mod defaults;
mod logging;
mod marker;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PROGRAM, DEFAULT_RESTART_TIMEOUT, DEFAULT_SHUTDOWN_GRACE,
    DEFAULT_STOP_SETTLE, default_log_file, default_log_filter, default_log_format,
    default_marker_policy, default_pid_file,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use marker::MarkerPolicy;

/// Environment variable that marks a process as the detached daemon child.
///
/// The name is part of the external contract: older and newer builds must
/// agree on it for `restart` to hand over cleanly.
pub const DAEMON_ENV_VAR: &str = "TETHER_DAEMON";

/// Value assigned to [`DAEMON_ENV_VAR`] in the daemon child's environment.
pub const DAEMON_ENV_VALUE: &str = "1";

/// Immutable lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    program: String,
    pid_file: Utf8PathBuf,
    log_file: Utf8PathBuf,
    log_filter: String,
    log_format: LogFormat,
    marker_policy: MarkerPolicy,
    restart_timeout: Duration,
    stop_settle: Duration,
    shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Config {
    /// Builds the default settings for `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            pid_file: default_pid_file(&program),
            log_file: default_log_file(&program),
            program,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
            marker_policy: default_marker_policy(),
            restart_timeout: DEFAULT_RESTART_TIMEOUT,
            stop_settle: DEFAULT_STOP_SETTLE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Overrides the PID marker location.
    #[must_use]
    pub fn with_pid_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.pid_file = path.into();
        self
    }

    /// Overrides the log sink location.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    /// Overrides the tracing filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Overrides the log output format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Selects how the worker claims the PID marker.
    #[must_use]
    pub fn with_marker_policy(mut self, policy: MarkerPolicy) -> Self {
        self.marker_policy = policy;
        self
    }

    /// Overrides how long `restart` waits for the previous instance.
    #[must_use]
    pub fn with_restart_timeout(mut self, timeout: Duration) -> Self {
        self.restart_timeout = timeout;
        self
    }

    /// Overrides how long `stop` watches the target before falling back to
    /// removing the marker itself.
    #[must_use]
    pub fn with_stop_settle(mut self, settle: Duration) -> Self {
        self.stop_settle = settle;
        self
    }

    /// Overrides how long a terminating worker may run after cancellation.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Layers command-line overrides on top of these settings.
    #[must_use]
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(path) = &overrides.pid_file {
            self.pid_file.clone_from(path);
        }
        if let Some(path) = &overrides.log_file {
            self.log_file.clone_from(path);
        }
        if let Some(filter) = &overrides.log_filter {
            self.log_filter.clone_from(filter);
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
        if overrides.exclusive_marker {
            self.marker_policy = MarkerPolicy::Exclusive;
        }
        self
    }

    /// Name of the embedding program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Path of the PID marker file.
    pub fn pid_file(&self) -> &Utf8Path {
        &self.pid_file
    }

    /// Path of the log sink.
    pub fn log_file(&self) -> &Utf8Path {
        &self.log_file
    }

    /// Tracing filter expression.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Marker claim policy.
    pub fn marker_policy(&self) -> MarkerPolicy {
        self.marker_policy
    }

    /// Bound for `restart`'s wait on the previous instance.
    pub fn restart_timeout(&self) -> Duration {
        self.restart_timeout
    }

    /// Bound for `stop`'s fallback marker check.
    pub fn stop_settle(&self) -> Duration {
        self.stop_settle
    }

    /// Bound for a terminating worker to return.
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }
}

/// Command-line flags that override the embedding program's settings.
///
/// The flags are global so they may appear before or after the verb. They are
/// forwarded verbatim to the daemon child, which therefore resolves the same
/// paths as the invocation that launched it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct ConfigOverrides {
    /// Path of the PID marker file.
    #[arg(long, global = true, value_name = "PATH")]
    pub pid_file: Option<Utf8PathBuf>,
    /// Path of the log sink used by the daemon.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<Utf8PathBuf>,
    /// Tracing filter expression, for example `debug` or `tetherd=trace`.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_filter: Option<String>,
    /// Log output format (`compact` or `json`).
    #[arg(long, global = true, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
    /// Refuse to overwrite an existing PID marker at startup.
    #[arg(long, global = true)]
    pub exclusive_marker: bool,
}
