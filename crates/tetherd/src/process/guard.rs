use tether_config::MarkerPolicy;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::{LifecycleError, PidFileError};
use super::pid_file::PidFileStore;
use super::probe::ProcessProbe;

/// Ownership of the PID marker for the lifetime of the worker.
///
/// Dropping the guard removes the marker, but only while it still records
/// this worker's pid.
#[derive(Debug)]
pub(super) struct MarkerGuard<'a> {
    store: &'a PidFileStore,
    pid: u32,
}

impl<'a> MarkerGuard<'a> {
    pub(super) fn claim(
        store: &'a PidFileStore,
        pid: u32,
        policy: MarkerPolicy,
        probe: &ProcessProbe,
    ) -> Result<Self, LifecycleError> {
        match policy {
            MarkerPolicy::Overwrite => store.write(pid)?,
            MarkerPolicy::Exclusive => claim_exclusive(store, pid, probe)?,
        }
        Ok(Self { store, pid })
    }

    pub(super) fn release(self) {
        drop(self);
    }
}

impl Drop for MarkerGuard<'_> {
    fn drop(&mut self) {
        match self.store.remove_if_owned(self.pid) {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    target: PROCESS_TARGET,
                    pid = self.pid,
                    file = %self.store.path(),
                    "pid file no longer records this process; leaving it"
                );
            }
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.store.path(),
                    error = %error,
                    "failed to remove pid file"
                );
            }
        }
    }
}

fn claim_exclusive(
    store: &PidFileStore,
    pid: u32,
    probe: &ProcessProbe,
) -> Result<(), LifecycleError> {
    match store.create_exclusive(pid) {
        Ok(()) => return Ok(()),
        Err(PidFileError::AlreadyExists { .. }) => {}
        Err(error) => return Err(error.into()),
    }
    match store.read() {
        Ok(existing) if existing != pid && probe.is_alive(existing) => {
            info!(
                target: PROCESS_TARGET,
                pid = existing,
                "refusing to start: existing process alive"
            );
            return Err(LifecycleError::AlreadyRunning { pid: existing });
        }
        Ok(_) | Err(PidFileError::NotFound { .. } | PidFileError::Corrupt { .. }) => {
            warn!(
                target: PROCESS_TARGET,
                file = %store.path(),
                "existing pid file is stale; replacing it"
            );
        }
        Err(error) => return Err(error.into()),
    }
    replace_stale(store, pid, probe)
}

/// Replaces a marker already judged stale.
///
/// The marker is first renamed aside, so only one claimant can take it. If
/// the renamed file turns out to name another live process, a concurrent
/// claimant replaced the stale marker first and its record is put back.
fn replace_stale(
    store: &PidFileStore,
    pid: u32,
    probe: &ProcessProbe,
) -> Result<(), LifecycleError> {
    if let Some(aside) = store.set_aside(pid)? {
        match aside.read() {
            Ok(owner) if owner != pid && probe.is_alive(owner) => {
                if !store.restore(&aside)? {
                    warn!(
                        target: PROCESS_TARGET,
                        pid = owner,
                        file = %store.path(),
                        "pid file replaced while restoring a live owner's record"
                    );
                }
                return Err(LifecycleError::AlreadyRunning { pid: owner });
            }
            Ok(_) | Err(PidFileError::NotFound { .. } | PidFileError::Corrupt { .. }) => {
                aside.remove()?;
            }
            Err(error) => return Err(error.into()),
        }
    }
    match store.create_exclusive(pid) {
        Ok(()) => Ok(()),
        Err(PidFileError::AlreadyExists { .. }) => match store.read() {
            Ok(winner) => Err(LifecycleError::AlreadyRunning { pid: winner }),
            Err(error) => Err(error.into()),
        },
        Err(error) => Err(error.into()),
    }
}
