//! Command-line runtime that turns a worker callback into a controllable
//! process.
//!
//! An embedding program hands [`run`] its arguments, its settings and the
//! worker. The runtime parses the verb, applies command-line overrides,
//! initialises telemetry and drives the [`tetherd::Lifecycle`]. Writers are
//! injected so tests can capture everything the operator would see.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tether_config::Config;
use tetherd::{Daemonizer, Lifecycle, Shutdown, SignalSource, StartRequest, telemetry};

mod cli;
mod errors;
mod output;

pub use cli::Verb;
use cli::Cli;
use errors::AppError;
use output::LifecycleOutput;

/// Runs the CLI for `worker` using the provided arguments and IO handles.
///
/// # Examples
///
/// ```no_run
/// use std::io;
/// use std::time::Duration;
///
/// use tether_config::Config;
///
/// let code = tether_cli::run(
///     std::env::args_os(),
///     Config::new("poller"),
///     |shutdown| while !shutdown.wait_timeout(Duration::from_secs(1)) {},
///     &mut io::stdout(),
///     &mut io::stderr(),
/// );
/// # let _ = code;
/// ```
#[must_use]
pub fn run<I, F, W, E>(
    args: I,
    config: Config,
    worker: F,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    F: Fn(&Shutdown) + Send + Sync + 'static,
    W: Write,
    E: Write,
{
    run_with(args, config, |config| Lifecycle::new(config, worker), stdout, stderr)
}

/// Runs the CLI with a caller-built [`Lifecycle`].
///
/// `build` receives the settings after command-line overrides, so it can
/// attach cleanup or reload hooks, or substitute collaborators.
#[must_use]
pub fn run_with<I, B, D, S, W, E>(
    args: I,
    config: Config,
    build: B,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    B: FnOnce(Config) -> Lifecycle<D, S>,
    D: Daemonizer,
    S: SignalSource,
    W: Write,
    E: Write,
{
    let mut output = LifecycleOutput::new(stdout, stderr);
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            return match output.stdout_text(&error.render().to_string()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(Err(AppError::CliUsage(error)), &mut output),
    };

    let config = config.apply_overrides(&cli.overrides);
    let result = telemetry::initialise(&config)
        .map_err(AppError::from)
        .and_then(|_| execute(&build(config), cli.verb, &mut output));
    report(result, &mut output)
}

pub(crate) fn execute<D, S, W, E>(
    lifecycle: &Lifecycle<D, S>,
    verb: Verb,
    output: &mut LifecycleOutput<W, E>,
) -> Result<(), AppError>
where
    D: Daemonizer,
    S: SignalSource,
    W: Write,
    E: Write,
{
    match verb {
        Verb::Start { daemon } => {
            let request = if daemon {
                StartRequest::daemon()
            } else {
                StartRequest::foreground()
            };
            let outcome = lifecycle.start(request)?;
            output.start(&outcome)
        }
        Verb::Stop => {
            let outcome = lifecycle.stop()?;
            output.stop(&outcome)
        }
        Verb::Restart => {
            if !lifecycle.role().is_daemon_child() {
                output.stdout_line(format_args!("Restarting daemon process..."))?;
            }
            let outcome = lifecycle.restart()?;
            output.start(&outcome)
        }
        Verb::Reload => {
            let outcome = lifecycle.reload()?;
            output.reload(&outcome)
        }
        Verb::Status => {
            let report = lifecycle.status()?;
            output.status(&report)
        }
    }
}

fn report<W: Write, E: Write>(
    result: Result<(), AppError>,
    output: &mut LifecycleOutput<W, E>,
) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = output.stderr_line(format_args!("{error}"));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
