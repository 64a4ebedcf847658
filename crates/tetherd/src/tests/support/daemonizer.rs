//! Test double for [`Daemonizer`] that launches a harmless stand-in child.
//!
//! Each call spawns `sleep 30` so the returned pid names a real process. The
//! children are killed and reaped when the last clone of the double drops.

use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};

use crate::{DaemonizeError, Daemonizer};

#[derive(Debug, Default)]
struct Launched {
    children: Mutex<Vec<Child>>,
    log_files: Mutex<Vec<Utf8PathBuf>>,
}

impl Drop for Launched {
    fn drop(&mut self) {
        let children = self
            .children
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for child in children.iter_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Records daemonisation requests.
#[derive(Debug, Clone, Default)]
pub struct RecordingDaemonizer {
    calls: Arc<AtomicUsize>,
    launched: Arc<Launched>,
}

impl RecordingDaemonizer {
    /// Number of daemonisation requests seen.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Pids handed back to the controller, in order.
    pub fn pids(&self) -> Vec<u32> {
        self.launched
            .children
            .lock()
            .expect("daemonizer mutex poisoned")
            .iter()
            .map(Child::id)
            .collect()
    }

    /// Log sinks requested by the controller, in order.
    pub fn log_files(&self) -> Vec<Utf8PathBuf> {
        self.launched
            .log_files
            .lock()
            .expect("daemonizer mutex poisoned")
            .clone()
    }
}

impl Daemonizer for RecordingDaemonizer {
    fn daemonize(&self, log_file: &Utf8Path) -> Result<u32, DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let child = Command::new("sleep")
            .arg("30")
            .spawn()
            .map_err(|source| DaemonizeError::Spawn {
                program: "sleep".into(),
                source,
            })?;
        let pid = child.id();
        self.launched
            .children
            .lock()
            .expect("daemonizer mutex poisoned")
            .push(child);
        self.launched
            .log_files
            .lock()
            .expect("daemonizer mutex poisoned")
            .push(log_file.to_path_buf());
        Ok(pid)
    }
}
