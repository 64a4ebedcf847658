//! Reference binary: a heartbeat worker under lifecycle control.
//!
//! The worker logs a heartbeat every few seconds until termination is
//! requested. `tether start --daemon` detaches it; `stop`, `restart`,
//! `reload` and `status` control the detached instance.

use std::io;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tether_config::Config;
use tetherd::{Lifecycle, Shutdown};
use tracing::info;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

static RELOADS: AtomicU64 = AtomicU64::new(0);

fn main() -> ExitCode {
    tether_cli::run_with(
        std::env::args_os(),
        Config::new("tether"),
        |config| {
            Lifecycle::new(config, heartbeat)
                .on_reload(|| {
                    let count = RELOADS.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(reloads = count, "reloading configuration");
                })
                .with_cleanup(|| info!("cleaning up before exit"))
        },
        &mut io::stdout(),
        &mut io::stderr(),
    )
}

fn heartbeat(shutdown: &Shutdown) {
    info!(pid = std::process::id(), "heartbeat worker running");
    let mut beats: u64 = 0;
    while !shutdown.wait_timeout(HEARTBEAT_INTERVAL) {
        beats += 1;
        info!(beats, "heartbeat");
    }
    info!(beats, signal = ?shutdown.signal(), "heartbeat worker stopping");
}
