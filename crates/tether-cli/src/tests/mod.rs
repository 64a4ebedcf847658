//! Unit tests for verb dispatch and error reporting.

mod support;

use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;
use tether_config::Config;
use tetherd::{Lifecycle, LifecycleError, ProcessRole};

use crate::errors::AppError;
use crate::output::LifecycleOutput;
use crate::{Verb, execute, run_with};

use support::{FixedPidDaemonizer, SilentSignalSource, temp_path};

const FAKE_DAEMON_PID: u32 = 4321;

type TestLifecycle = Lifecycle<FixedPidDaemonizer, SilentSignalSource>;

struct Harness {
    _dir: TempDir,
    config: Config,
    runs: Arc<AtomicUsize>,
}

impl Harness {
    fn lifecycle(&self) -> TestLifecycle {
        build(self.config.clone(), Arc::clone(&self.runs))
    }

    fn write_marker(&self, content: &str) {
        let path = self.config.pid_file();
        fs::create_dir_all(path.parent().expect("marker parent")).expect("marker directory");
        fs::write(path, content).expect("seed marker");
    }

    fn execute(&self, verb: Verb) -> (Result<(), AppError>, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let result = execute(
            &self.lifecycle(),
            verb,
            &mut LifecycleOutput::new(&mut stdout, &mut stderr),
        );
        (
            result,
            String::from_utf8(stdout).expect("utf-8 stdout"),
            String::from_utf8(stderr).expect("utf-8 stderr"),
        )
    }
}

fn build(config: Config, runs: Arc<AtomicUsize>) -> TestLifecycle {
    Lifecycle::new(config, move |_| {
        runs.fetch_add(1, Ordering::SeqCst);
    })
    .with_role(ProcessRole::Controller)
    .with_daemonizer(FixedPidDaemonizer(FAKE_DAEMON_PID))
    .with_signal_source(SilentSignalSource)
}

#[fixture]
fn harness() -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let config = Config::new("cli-test")
        .with_pid_file(temp_path(&dir, "run/cli-test.pid"))
        .with_log_file(temp_path(&dir, "cli-test.log"))
        .with_restart_timeout(Duration::from_millis(100))
        .with_stop_settle(Duration::from_millis(50));
    Harness {
        _dir: dir,
        config,
        runs: Arc::default(),
    }
}

#[rstest]
fn status_of_fresh_configuration_is_stopped(harness: Harness) {
    let (result, stdout, _) = harness.execute(Verb::Status);
    assert!(result.is_ok(), "status failed: {result:?}");
    assert!(stdout.starts_with("Status: stopped\n"), "stdout: {stdout}");
    assert!(!stdout.contains("PID: "), "stdout: {stdout}");
    assert!(stdout.contains(&format!("PID file: {}", harness.config.pid_file())));
}

#[rstest]
fn daemon_start_reports_child_pid_and_log(harness: Harness) {
    let (result, stdout, _) = harness.execute(Verb::Start { daemon: true });
    assert!(result.is_ok(), "start failed: {result:?}");
    assert_eq!(
        stdout,
        format!(
            "Daemon started with PID: {FAKE_DAEMON_PID}\nLog file: {}\n",
            harness.config.log_file()
        )
    );
    assert_eq!(harness.runs.load(Ordering::SeqCst), 0);
}

#[rstest]
fn foreground_start_runs_worker_in_process(harness: Harness) {
    let (result, stdout, _) = harness.execute(Verb::Start { daemon: false });
    assert!(result.is_ok(), "start failed: {result:?}");
    assert!(stdout.is_empty(), "stdout: {stdout}");
    assert_eq!(harness.runs.load(Ordering::SeqCst), 1);
    assert!(!harness.config.pid_file().exists());
}

#[rstest]
fn restart_over_stale_marker_launches_daemon(harness: Harness) {
    harness.write_marker("999999999");
    let (result, stdout, _) = harness.execute(Verb::Restart);
    assert!(result.is_ok(), "restart failed: {result:?}");
    assert!(stdout.starts_with("Restarting daemon process...\n"), "stdout: {stdout}");
    assert!(stdout.contains(&format!("Daemon started with PID: {FAKE_DAEMON_PID}")));
    assert!(!harness.config.pid_file().exists());
}

#[rstest]
#[case::reload(Verb::Reload)]
#[case::stop(Verb::Stop)]
fn stale_marker_is_reported_as_missing_target(harness: Harness, #[case] verb: Verb) {
    harness.write_marker("999999999");
    let (result, stdout, _) = harness.execute(verb);
    assert!(
        matches!(
            result,
            Err(AppError::Lifecycle(LifecycleError::TargetNotFound { pid: 999_999_999 }))
        ),
        "got {result:?}"
    );
    assert!(stdout.is_empty());
}

#[rstest]
fn status_reports_running_process(harness: Harness) {
    harness.write_marker(&std::process::id().to_string());
    let (_, stdout, _) = harness.execute(Verb::Status);
    assert!(stdout.starts_with("Status: running\n"), "stdout: {stdout}");
    assert!(stdout.contains(&format!("PID: {}\n", std::process::id())));
}

#[rstest]
fn start_over_live_marker_is_refused(harness: Harness) {
    harness.write_marker(&std::process::id().to_string());
    let (result, _, _) = harness.execute(Verb::Start { daemon: true });
    assert!(
        matches!(result, Err(AppError::Lifecycle(LifecycleError::AlreadyRunning { .. }))),
        "got {result:?}"
    );
}

fn run_captured(harness: &Harness, args: &[&str]) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let runs = Arc::clone(&harness.runs);
    let exit = run_with(
        args.iter().map(OsString::from),
        harness.config.clone(),
        move |config| build(config, runs),
        &mut stdout,
        &mut stderr,
    );
    (
        exit,
        String::from_utf8(stdout).expect("utf-8 stdout"),
        String::from_utf8(stderr).expect("utf-8 stderr"),
    )
}

#[rstest]
fn failures_exit_non_zero_with_message(harness: Harness) {
    harness.write_marker("999999999");
    let (exit, _, stderr) = run_captured(&harness, &["tether", "reload"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stderr.contains("999999999 is not running"), "stderr: {stderr}");
}

#[rstest]
fn command_line_paths_override_settings(harness: Harness) {
    let dir = TempDir::new().expect("temp dir");
    let pid_file = temp_path(&dir, "override.pid");
    let (exit, stdout, _) = run_captured(
        &harness,
        &["tether", "status", "--pid-file", pid_file.as_str()],
    );
    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(stdout.contains(&format!("PID file: {pid_file}")), "stdout: {stdout}");
}

#[rstest]
fn help_is_written_to_stdout(harness: Harness) {
    let (exit, stdout, stderr) = run_captured(&harness, &["tether", "--help"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(stdout.contains("restart"), "stdout: {stdout}");
    assert!(stderr.is_empty(), "stderr: {stderr}");
}

#[rstest]
#[case::missing_verb(&["tether"])]
#[case::unknown_verb(&["tether", "pause"])]
#[case::bad_format(&["tether", "--log-format", "xml", "status"])]
fn usage_errors_exit_non_zero(harness: Harness, #[case] args: &[&str]) {
    let (exit, stdout, stderr) = run_captured(&harness, args);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty(), "stdout: {stdout}");
    assert!(!stderr.is_empty());
}
