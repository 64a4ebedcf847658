//! Doubles that keep CLI tests away from real daemonisation and signals.

use std::sync::mpsc;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use tetherd::{
    ControlSignal, DaemonizeError, Daemonizer, RouterError, SignalSource, SignalStream,
    Subscription,
};

/// Pretends to launch a daemon and reports a fixed pid.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedPidDaemonizer(pub(crate) u32);

impl Daemonizer for FixedPidDaemonizer {
    fn daemonize(&self, _log_file: &Utf8Path) -> Result<u32, DaemonizeError> {
        Ok(self.0)
    }
}

/// Signal source that never delivers a signal.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SilentSignalSource;

struct SilentStream(mpsc::Receiver<()>);

impl SignalStream for SilentStream {
    fn next_signal(&mut self) -> Option<ControlSignal> {
        let _ = self.0.recv();
        None
    }
}

impl SignalSource for SilentSignalSource {
    fn subscribe(&self) -> Result<Subscription, RouterError> {
        let (sender, receiver) = mpsc::channel();
        Ok(Subscription::new(
            Box::new(SilentStream(receiver)),
            Box::new(move || {
                let _ = sender.send(());
            }),
        ))
    }
}

/// UTF-8 path of `name` inside `dir`.
pub(crate) fn temp_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("temp paths should be UTF-8")
}
