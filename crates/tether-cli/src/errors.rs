//! Error types for the CLI runtime.

use std::io;

use thiserror::Error;
use tetherd::{LifecycleError, TelemetryError};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("failed to write command output: {0}")]
    Output(#[source] io::Error),
}
