//! Test doubles shared by the unit and behavioural suites.

mod daemonizer;
mod signals;

use std::process::{Child, Command, Stdio};

use camino::Utf8PathBuf;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tempfile::TempDir;

pub use daemonizer::RecordingDaemonizer;
pub use signals::{ChannelSignalSource, FailingSignalSource, RecordingExit};

/// A `sleep` child that is killed and reaped on drop.
#[derive(Debug)]
pub struct SleepingChild(pub Child);

impl SleepingChild {
    /// Spawns `sleep 30`.
    pub fn spawn() -> Self {
        Self(
            Command::new("sleep")
                .arg("30")
                .spawn()
                .expect("spawn sleep"),
        )
    }

    /// Child pid.
    pub fn pid(&self) -> u32 {
        self.0.id()
    }
}

impl Drop for SleepingChild {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// A background process that is not a child of the test process.
///
/// The spawning shell exits at once, so the process is re-parented and
/// reaped by someone else when it dies. Killed on drop.
#[derive(Debug)]
pub struct OrphanProcess(u32);

impl OrphanProcess {
    /// Runs `script` with `sh` in the background of a short-lived shell.
    pub fn spawn(script: &str, args: &[&str]) -> Self {
        let output = Command::new("sh")
            .arg("-c")
            .arg(r#"script=$1; shift; sh -c "$script" sh "$@" >/dev/null 2>&1 & echo $!"#)
            .arg("sh")
            .arg(script)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .expect("spawn orphan");
        let pid = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .expect("orphan pid");
        Self(pid)
    }

    /// Orphan pid.
    pub fn pid(&self) -> u32 {
        self.0
    }
}

impl Drop for OrphanProcess {
    fn drop(&mut self) {
        if let Ok(raw) = i32::try_from(self.0) {
            let _ = kill(Pid::from_raw(raw), Signal::SIGKILL);
        }
    }
}

/// UTF-8 path of `name` inside `dir`.
pub fn temp_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("temp paths should be UTF-8")
}
