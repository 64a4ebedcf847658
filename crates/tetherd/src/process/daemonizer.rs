//! Implements the daemonisation backend.
//!
//! The production backend re-executes the current program with the daemon
//! marker in its environment. The child runs in a fresh session with its
//! output appended to the log sink, and recognises itself through
//! [`ProcessRole::detect`](super::ProcessRole::detect).

use std::env;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tether_config::{DAEMON_ENV_VALUE, DAEMON_ENV_VAR};
use tracing::info;

use super::PROCESS_TARGET;
use super::errors::DaemonizeError;
use super::pid_file::parent_directory;

/// Abstraction over daemonisation strategies.
pub trait Daemonizer: Send + Sync {
    /// Launches a detached copy of the worker and returns its pid without
    /// waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonizeError`] when the log sink cannot be opened or the
    /// child cannot be started.
    fn daemonize(&self, log_file: &Utf8Path) -> Result<u32, DaemonizeError>;
}

/// Daemoniser that re-executes a program image with the daemon marker set.
#[derive(Debug, Clone, Default)]
pub struct SelfExecDaemonizer {
    program: Option<PathBuf>,
    arguments: Vec<OsString>,
}

impl SelfExecDaemonizer {
    /// Re-executes the running binary with the arguments it was invoked with.
    #[must_use]
    pub fn from_current_process() -> Self {
        Self {
            program: None,
            arguments: env::args_os().skip(1).collect(),
        }
    }

    /// Executes `program` with `arguments` instead of the running binary.
    #[must_use]
    pub fn new<I, A>(program: impl Into<PathBuf>, arguments: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: Some(program.into()),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    fn resolve_program(&self) -> Result<PathBuf, DaemonizeError> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => env::current_exe().map_err(|source| DaemonizeError::CurrentExe { source }),
        }
    }
}

impl Daemonizer for SelfExecDaemonizer {
    fn daemonize(&self, log_file: &Utf8Path) -> Result<u32, DaemonizeError> {
        let program = self.resolve_program()?;
        let stdout = open_log_sink(log_file)?;
        let stderr = stdout.try_clone().map_err(|source| DaemonizeError::LogSink {
            path: log_file.to_path_buf(),
            source,
        })?;

        let mut command = Command::new(&program);
        command
            .args(&self.arguments)
            .env(DAEMON_ENV_VAR, DAEMON_ENV_VALUE)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        detach_session(&mut command);

        let child = command
            .spawn()
            .map_err(|source| DaemonizeError::Spawn { program, source })?;
        let pid = child.id();
        info!(
            target: PROCESS_TARGET,
            pid,
            log = %log_file,
            "daemon child launched"
        );
        Ok(pid)
    }
}

fn open_log_sink(path: &Utf8Path) -> Result<File, DaemonizeError> {
    let sink_error = |source: io::Error| DaemonizeError::LogSink {
        path: Utf8PathBuf::from(path),
        source,
    };
    fs::create_dir_all(parent_directory(path)).map_err(sink_error)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(sink_error)
}

#[cfg(unix)]
fn detach_session(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    use nix::unistd::setsid;

    // SAFETY: the hook runs between fork and exec and only calls setsid(2),
    // which is async-signal-safe.
    unsafe {
        command.pre_exec(|| setsid().map(drop).map_err(io::Error::from));
    }
}

#[cfg(not(unix))]
fn detach_session(_command: &mut Command) {}
