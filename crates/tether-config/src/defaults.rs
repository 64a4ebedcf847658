use std::time::Duration;

use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::marker::MarkerPolicy;

/// Program name used when the embedding program does not supply one.
pub const DEFAULT_PROGRAM: &str = "tether";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Bound on how long `restart` waits for the previous instance to exit.
pub const DEFAULT_RESTART_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on how long `stop` watches the target before its fallback cleanup.
pub const DEFAULT_STOP_SETTLE: Duration = Duration::from_secs(2);

/// Bound on how long a terminating worker may take to observe cancellation.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default marker write policy; matches the historical last-writer-wins
/// behaviour.
pub fn default_marker_policy() -> MarkerPolicy {
    MarkerPolicy::Overwrite
}

/// Fallback PID marker location: `./<program>.pid`.
pub fn default_pid_file(program: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("./{program}.pid"))
}

/// Fallback log sink location: `./<program>.log`.
pub fn default_log_file(program: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("./{program}.log"))
}
