//! CLI argument definitions for lifecycle control.

use clap::{Parser, Subcommand};
use tether_config::ConfigOverrides;

/// Command-line interface wrapped around an embedded worker.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) overrides: ConfigOverrides,
    #[command(subcommand)]
    pub(crate) verb: Verb,
}

/// Lifecycle verbs.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Runs the worker, in the foreground unless `--daemon` is given.
    Start {
        /// Detach into a background daemon.
        #[arg(short, long)]
        daemon: bool,
    },
    /// Sends SIGTERM to the running worker.
    Stop,
    /// Stops any running worker, then starts a new daemon.
    Restart,
    /// Sends SIGHUP to the running worker.
    Reload,
    /// Reports whether the worker is running.
    Status,
}
