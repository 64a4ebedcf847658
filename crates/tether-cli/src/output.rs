//! Renders lifecycle outcomes for operators.

use std::fmt;
use std::io::Write;

use tetherd::{ReloadOutcome, StartOutcome, StatusReport, StopOutcome};

use crate::errors::AppError;

/// Output handle abstracting over stdout/stderr writers.
pub(crate) struct LifecycleOutput<W: Write, E: Write> {
    stdout: W,
    stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    pub(crate) fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    pub(crate) fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), AppError> {
        self.stdout.write_fmt(args).map_err(AppError::Output)?;
        self.stdout.write_all(b"\n").map_err(AppError::Output)?;
        self.stdout.flush().map_err(AppError::Output)
    }

    pub(crate) fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), AppError> {
        self.stderr.write_fmt(args).map_err(AppError::Output)?;
        self.stderr.write_all(b"\n").map_err(AppError::Output)?;
        self.stderr.flush().map_err(AppError::Output)
    }

    /// Writes unterminated text, such as clap's rendered help.
    pub(crate) fn stdout_text(&mut self, text: &str) -> Result<(), AppError> {
        self.stdout.write_all(text.as_bytes()).map_err(AppError::Output)?;
        self.stdout.flush().map_err(AppError::Output)
    }

    pub(crate) fn start(&mut self, outcome: &StartOutcome) -> Result<(), AppError> {
        match outcome {
            StartOutcome::Detached { pid, log_file } => {
                self.stdout_line(format_args!("Daemon started with PID: {pid}"))?;
                self.stdout_line(format_args!("Log file: {log_file}"))
            }
            // The worker's own logs already describe the run.
            StartOutcome::Completed { .. } => Ok(()),
        }
    }

    pub(crate) fn stop(&mut self, outcome: &StopOutcome) -> Result<(), AppError> {
        self.stdout_line(format_args!("Sent SIGTERM signal to process {}", outcome.pid))?;
        if !outcome.exited {
            self.stderr_line(format_args!(
                "process {} is still shutting down",
                outcome.pid
            ))?;
        }
        Ok(())
    }

    pub(crate) fn reload(&mut self, outcome: &ReloadOutcome) -> Result<(), AppError> {
        self.stdout_line(format_args!("Sent SIGHUP signal to process {}", outcome.pid))
    }

    pub(crate) fn status(&mut self, report: &StatusReport) -> Result<(), AppError> {
        self.stdout_line(format_args!("Status: {}", report.state))?;
        if let Some(pid) = report.state.pid() {
            self.stdout_line(format_args!("PID: {pid}"))?;
        }
        self.stdout_line(format_args!("PID file: {}", report.pid_file))?;
        self.stdout_line(format_args!("Log file: {}", report.log_file))
    }
}
