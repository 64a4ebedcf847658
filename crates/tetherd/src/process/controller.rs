//! Orchestrates the start, stop, restart, reload and status operations.
//!
//! Each operation is evaluated afresh against the PID marker and the process
//! table; nothing is cached between calls. Operations that merely forward a
//! signal never write the marker: only the process running the worker does.

use std::fmt;
use std::sync::Arc;

use nix::sys::signal::Signal;
use tether_config::Config;
use tracing::{debug, info, warn};

use super::PROCESS_TARGET;
use super::daemonizer::{Daemonizer, SelfExecDaemonizer};
use super::errors::{LifecycleError, PidFileError, SignalError};
use super::guard::MarkerGuard;
use super::launch::{ProcessRole, StartRequest};
use super::pid_file::PidFileStore;
use super::probe::ProcessProbe;
use super::report::{
    CompletionReason, ProcessState, ReloadOutcome, StartOutcome, StatusReport, StopOutcome,
};
use super::shutdown::Shutdown;
use super::signals::{
    ExitHook, Hook, RouterPlan, SignalRouter, SignalSource, SystemSignalSource, exit_process,
};

/// Worker callback. Receives the token that reports termination requests.
pub type Worker = Box<dyn Fn(&Shutdown) + Send + Sync>;

/// Lifecycle controller for a single worker.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use tether_config::Config;
/// use tetherd::{Lifecycle, StartRequest};
///
/// # fn main() -> Result<(), tetherd::LifecycleError> {
/// let lifecycle = Lifecycle::new(Config::new("heartbeat"), |shutdown| {
///     while !shutdown.wait_timeout(Duration::from_secs(5)) {
///         tracing::info!("still alive");
///     }
/// });
/// lifecycle.start(StartRequest::daemon())?;
/// # Ok(())
/// # }
/// ```
pub struct Lifecycle<D = SelfExecDaemonizer, S = SystemSignalSource> {
    config: Config,
    store: PidFileStore,
    worker: Worker,
    cleanup: Option<Hook>,
    reload: Option<Hook>,
    role: ProcessRole,
    probe: ProcessProbe,
    daemonizer: D,
    signals: S,
    exit: ExitHook,
}

impl Lifecycle {
    /// Builds a controller with the production collaborators.
    ///
    /// The role is detected from the environment, so a re-executed daemon
    /// child recognises itself without further setup.
    pub fn new<F>(config: Config, worker: F) -> Self
    where
        F: Fn(&Shutdown) + Send + Sync + 'static,
    {
        Self {
            store: PidFileStore::new(config.pid_file()),
            config,
            worker: Box::new(worker),
            cleanup: None,
            reload: None,
            role: ProcessRole::detect(),
            probe: ProcessProbe::new(),
            daemonizer: SelfExecDaemonizer::from_current_process(),
            signals: SystemSignalSource,
            exit: Arc::new(exit_process),
        }
    }
}

impl<D, S> Lifecycle<D, S>
where
    D: Daemonizer,
    S: SignalSource,
{
    /// Runs `cleanup` on the signal thread when termination is requested.
    #[must_use]
    pub fn with_cleanup<F>(mut self, cleanup: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cleanup = Some(Arc::new(cleanup));
        self
    }

    /// Runs `hook` on the signal thread whenever SIGHUP arrives.
    #[must_use]
    pub fn on_reload<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.reload = Some(Arc::new(hook));
        self
    }

    /// Overrides the detected process role.
    #[must_use]
    pub fn with_role(mut self, role: ProcessRole) -> Self {
        self.role = role;
        self
    }

    /// Replaces the liveness probe.
    #[must_use]
    pub fn with_probe(mut self, probe: ProcessProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Replaces the daemonisation backend.
    pub fn with_daemonizer<D2: Daemonizer>(self, daemonizer: D2) -> Lifecycle<D2, S> {
        Lifecycle {
            config: self.config,
            store: self.store,
            worker: self.worker,
            cleanup: self.cleanup,
            reload: self.reload,
            role: self.role,
            probe: self.probe,
            daemonizer,
            signals: self.signals,
            exit: self.exit,
        }
    }

    /// Replaces the source of control signals.
    pub fn with_signal_source<S2: SignalSource>(self, signals: S2) -> Lifecycle<D, S2> {
        Lifecycle {
            config: self.config,
            store: self.store,
            worker: self.worker,
            cleanup: self.cleanup,
            reload: self.reload,
            role: self.role,
            probe: self.probe,
            daemonizer: self.daemonizer,
            signals,
            exit: self.exit,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_exit_hook(mut self, exit: ExitHook) -> Self {
        self.exit = exit;
        self
    }

    /// Settings in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Role this controller acts in.
    pub fn role(&self) -> ProcessRole {
        self.role
    }

    /// Starts the worker.
    ///
    /// In the daemon child, or when `request` asks for the foreground, the
    /// worker runs on the calling thread and this returns once it finishes.
    /// Otherwise a daemon child is launched and its pid returned at once.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyRunning`] when a live process owns
    /// the marker, and propagates marker, daemonisation and signal-handler
    /// failures.
    pub fn start(&self, request: StartRequest) -> Result<StartOutcome, LifecycleError> {
        if self.role.is_daemon_child() {
            return self.run_worker();
        }
        self.ensure_not_running()?;
        if request.daemonize {
            self.detach()
        } else {
            self.run_worker()
        }
    }

    /// Sends SIGTERM to the recorded process.
    ///
    /// The target's own handler removes the marker. If the target exits
    /// within the settle period and the marker still records it, `stop`
    /// removes the marker itself.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] or [`LifecycleError::Corrupt`]
    /// when the marker is unusable and [`LifecycleError::TargetNotFound`]
    /// when the recorded process is gone; the stale marker is removed first.
    pub fn stop(&self) -> Result<StopOutcome, LifecycleError> {
        let pid = self.store.read()?;
        match self.probe.signal(pid, Signal::SIGTERM) {
            Ok(()) => {}
            Err(SignalError::TargetNotFound { pid }) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid,
                    file = %self.store.path(),
                    "recorded process is gone; removing stale pid file"
                );
                self.discard_marker(pid);
                return Err(LifecycleError::TargetNotFound { pid });
            }
            Err(error) => return Err(error.into()),
        }
        info!(target: PROCESS_TARGET, pid, "sent SIGTERM");

        let exited = self.probe.wait_for_exit(pid, self.config.stop_settle());
        let marker_removed = exited && self.clear_exited_marker(pid);
        Ok(StopOutcome {
            pid,
            exited,
            marker_removed,
        })
    }

    /// Stops any live instance, then starts a new daemon.
    ///
    /// A process that outlives the restart timeout is abandoned: the marker
    /// is cleared and the new instance launched regardless. In the daemon
    /// child this behaves as the child half of [`Self::start`].
    ///
    /// # Errors
    ///
    /// Propagates marker, signal and daemonisation failures.
    pub fn restart(&self) -> Result<StartOutcome, LifecycleError> {
        if self.role.is_daemon_child() {
            return self.run_worker();
        }
        match self.store.read() {
            Ok(pid) if self.probe.is_alive(pid) => self.terminate_previous(pid)?,
            Ok(pid) => {
                debug!(target: PROCESS_TARGET, pid, "previous instance already gone");
            }
            Err(PidFileError::NotFound { .. }) => {}
            Err(PidFileError::Corrupt { content, .. }) => {
                debug!(target: PROCESS_TARGET, %content, "ignoring corrupt pid file");
            }
            Err(error) => return Err(error.into()),
        }
        self.store.remove()?;
        self.detach()
    }

    /// Sends SIGHUP to the recorded process.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TargetNotFound`] when the marker is stale,
    /// alongside the usual marker errors.
    pub fn reload(&self) -> Result<ReloadOutcome, LifecycleError> {
        let pid = self.store.read()?;
        if !self.probe.is_alive(pid) {
            return Err(LifecycleError::TargetNotFound { pid });
        }
        self.probe.signal(pid, Signal::SIGHUP)?;
        info!(target: PROCESS_TARGET, pid, "sent SIGHUP");
        Ok(ReloadOutcome { pid })
    }

    /// Classifies the marker without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::PidFile`] when the marker exists but cannot
    /// be read.
    pub fn status(&self) -> Result<StatusReport, LifecycleError> {
        let state = match self.store.read() {
            Ok(pid) if self.probe.is_alive(pid) => ProcessState::Running { pid },
            Ok(pid) => ProcessState::Stale { pid: Some(pid) },
            Err(PidFileError::NotFound { .. }) => ProcessState::Stopped,
            Err(PidFileError::Corrupt { .. }) => ProcessState::Stale { pid: None },
            Err(error) => return Err(error.into()),
        };
        debug!(target: PROCESS_TARGET, %state, "status evaluated");
        Ok(StatusReport {
            state,
            pid_file: self.store.path().to_path_buf(),
            log_file: self.config.log_file().to_path_buf(),
        })
    }

    fn ensure_not_running(&self) -> Result<(), LifecycleError> {
        match self.store.read() {
            Ok(pid) if self.probe.is_alive(pid) => Err(LifecycleError::AlreadyRunning { pid }),
            Ok(_) | Err(PidFileError::NotFound { .. } | PidFileError::Corrupt { .. }) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn detach(&self) -> Result<StartOutcome, LifecycleError> {
        let log_file = self.config.log_file();
        let pid = self.daemonizer.daemonize(log_file)?;
        info!(
            target: PROCESS_TARGET,
            pid,
            log = %log_file,
            "daemon started"
        );
        Ok(StartOutcome::detached(pid, log_file))
    }

    fn run_worker(&self) -> Result<StartOutcome, LifecycleError> {
        let pid = std::process::id();
        let guard = MarkerGuard::claim(&self.store, pid, self.config.marker_policy(), &self.probe)?;
        let shutdown = Shutdown::new();
        let router = SignalRouter::install(
            &self.signals,
            RouterPlan {
                marker: self.store.clone(),
                pid,
                shutdown: shutdown.clone(),
                cleanup: self.cleanup.clone(),
                reload: self.reload.clone(),
                grace: self.config.shutdown_grace(),
                exit: Arc::clone(&self.exit),
            },
        )?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.store.path(),
            role = ?self.role,
            "worker started"
        );

        (self.worker)(&shutdown);
        shutdown.finish_worker();
        router.shutdown();
        guard.release();

        let reason = match shutdown.signal() {
            Some(signal) => CompletionReason::Terminated { signal },
            None => CompletionReason::WorkerReturned,
        };
        info!(target: PROCESS_TARGET, pid, ?reason, "worker finished");
        Ok(StartOutcome::Completed { pid, reason })
    }

    fn terminate_previous(&self, pid: u32) -> Result<(), LifecycleError> {
        match self.probe.signal(pid, Signal::SIGTERM) {
            Ok(()) => info!(target: PROCESS_TARGET, pid, "sent SIGTERM to previous instance"),
            Err(SignalError::TargetNotFound { .. }) => {
                debug!(target: PROCESS_TARGET, pid, "previous instance exited before SIGTERM");
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        }
        let timeout = self.config.restart_timeout();
        if !self.probe.wait_for_exit(pid, timeout) {
            warn!(
                target: PROCESS_TARGET,
                pid,
                timeout_ms = timeout.as_millis(),
                "previous instance still running after timeout; continuing"
            );
        }
        Ok(())
    }

    fn clear_exited_marker(&self, pid: u32) -> bool {
        match self.store.remove_if_owned(pid) {
            Ok(removed) => {
                if removed {
                    debug!(
                        target: PROCESS_TARGET,
                        pid,
                        "process exited without removing its pid file"
                    );
                }
                removed
            }
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.store.path(),
                    error = %error,
                    "failed to remove pid file of exited process"
                );
                false
            }
        }
    }

    fn discard_marker(&self, pid: u32) {
        if let Err(error) = self.store.remove_if_owned(pid) {
            warn!(
                target: PROCESS_TARGET,
                file = %self.store.path(),
                error = %error,
                "failed to remove stale pid file"
            );
        }
    }
}

impl<D, S> fmt::Debug for Lifecycle<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("config", &self.config)
            .field("role", &self.role)
            .field("has_cleanup", &self.cleanup.is_some())
            .field("has_reload", &self.reload.is_some())
            .finish_non_exhaustive()
    }
}
