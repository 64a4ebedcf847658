//! Routes termination and reload signals while the worker runs.
//!
//! Dispatch happens on a dedicated thread so the worker callback keeps the
//! calling thread. The first termination signal is final: it cancels the
//! [`Shutdown`] token, runs the cleanup hook, and gives the worker a bounded
//! grace period before the process exits regardless. Repeated termination
//! signals arriving after that point are ignored.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{debug, info, warn};

use super::errors::RouterError;
use super::pid_file::PidFileStore;
use super::shutdown::Shutdown;

const SIGNALS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::signals");

/// Callback run from the dispatch thread.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Terminates the process with the given status once the grace period has
/// run out.
pub(crate) type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Signals understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// SIGTERM or SIGINT, carrying the raw signal number.
    Terminate(i32),
    /// SIGHUP.
    Reload,
}

impl ControlSignal {
    /// Maps a raw signal number onto a control signal.
    pub fn from_raw(signal: i32) -> Option<Self> {
        match signal {
            SIGTERM | SIGINT => Some(Self::Terminate(signal)),
            SIGHUP => Some(Self::Reload),
            _ => None,
        }
    }
}

/// Blocking stream of control signals.
pub trait SignalStream: Send {
    /// Blocks for the next signal; `None` once the stream is closed.
    fn next_signal(&mut self) -> Option<ControlSignal>;
}

/// Registration of interest in control signals.
pub struct Subscription {
    stream: Box<dyn SignalStream>,
    closer: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    /// Pairs a stream with the action that makes it yield `None`.
    pub fn new(stream: Box<dyn SignalStream>, closer: Box<dyn FnOnce() + Send>) -> Self {
        Self { stream, closer }
    }
}

/// Abstraction over signal delivery mechanisms.
pub trait SignalSource: Send + Sync {
    /// Installs handlers and returns the resulting subscription.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Install`] when handlers cannot be registered.
    fn subscribe(&self) -> Result<Subscription, RouterError>;
}

/// Signal source backed by `signal-hook`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignalSource;

impl SignalSource for SystemSignalSource {
    fn subscribe(&self) -> Result<Subscription, RouterError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGHUP])
            .map_err(|source| RouterError::Install { source })?;
        let handle = signals.handle();
        Ok(Subscription::new(
            Box::new(SystemSignalStream { signals }),
            Box::new(move || handle.close()),
        ))
    }
}

struct SystemSignalStream {
    signals: Signals,
}

impl SignalStream for SystemSignalStream {
    fn next_signal(&mut self) -> Option<ControlSignal> {
        loop {
            let raw = self.signals.forever().next()?;
            if let Some(signal) = ControlSignal::from_raw(raw) {
                return Some(signal);
            }
        }
    }
}

/// Everything the dispatch thread needs to act on a signal.
pub(crate) struct RouterPlan {
    pub(crate) marker: PidFileStore,
    pub(crate) pid: u32,
    pub(crate) shutdown: Shutdown,
    pub(crate) cleanup: Option<Hook>,
    pub(crate) reload: Option<Hook>,
    pub(crate) grace: Duration,
    pub(crate) exit: ExitHook,
}

/// Handle to the running dispatch thread.
pub(crate) struct SignalRouter {
    closer: Option<Box<dyn FnOnce() + Send>>,
    thread: Option<JoinHandle<()>>,
}

impl SignalRouter {
    /// Subscribes to `source` and starts dispatching on a background thread.
    pub(crate) fn install(
        source: &dyn SignalSource,
        plan: RouterPlan,
    ) -> Result<Self, RouterError> {
        let Subscription { mut stream, closer } = source.subscribe()?;
        let thread = thread::Builder::new()
            .name("tether-signals".to_owned())
            .spawn(move || route(stream.as_mut(), &plan))
            .map_err(|source| RouterError::Thread { source })?;
        debug!(target: SIGNALS_TARGET, "signal router installed");
        Ok(Self {
            closer: Some(closer),
            thread: Some(thread),
        })
    }

    /// Closes the subscription and waits for any in-flight dispatch,
    /// including a running cleanup hook, to finish.
    pub(crate) fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(target: SIGNALS_TARGET, "signal dispatch thread panicked");
        }
    }
}

impl Drop for SignalRouter {
    fn drop(&mut self) {
        self.close();
    }
}

fn route(stream: &mut dyn SignalStream, plan: &RouterPlan) {
    while let Some(signal) = stream.next_signal() {
        match signal {
            ControlSignal::Reload => reload(plan),
            ControlSignal::Terminate(raw) => {
                terminate(plan, raw);
                return;
            }
        }
    }
    debug!(target: SIGNALS_TARGET, "signal stream closed");
}

fn reload(plan: &RouterPlan) {
    info!(target: SIGNALS_TARGET, pid = plan.pid, "reload requested");
    if let Some(hook) = &plan.reload {
        hook();
    }
}

fn terminate(plan: &RouterPlan, signal: i32) {
    if !plan.shutdown.request(signal) {
        return;
    }
    info!(
        target: SIGNALS_TARGET,
        pid = plan.pid,
        signal,
        "termination requested"
    );
    if let Some(cleanup) = &plan.cleanup {
        cleanup();
    }
    if plan.shutdown.wait_for_worker(plan.grace) {
        debug!(target: SIGNALS_TARGET, "worker returned within grace period");
        return;
    }
    warn!(
        target: SIGNALS_TARGET,
        pid = plan.pid,
        grace_ms = plan.grace.as_millis(),
        "worker ignored shutdown; exiting"
    );
    if let Err(error) = plan.marker.remove_if_owned(plan.pid) {
        warn!(
            target: SIGNALS_TARGET,
            file = %plan.marker.path(),
            error = %error,
            "failed to remove pid file"
        );
    }
    (plan.exit)(0);
}

/// Default [`ExitHook`].
pub(crate) fn exit_process(code: i32) {
    std::process::exit(code)
}
