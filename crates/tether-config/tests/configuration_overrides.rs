//! Verifies that command-line overrides layer over programmatic settings.

use camino::Utf8Path;
use clap::Parser;
use rstest::rstest;
use tether_config::{Config, ConfigOverrides, LogFormat, MarkerPolicy};

#[derive(Debug, Parser)]
struct Harness {
    #[command(flatten)]
    overrides: ConfigOverrides,
}

fn parse(args: &[&str]) -> ConfigOverrides {
    let argv = std::iter::once("tether").chain(args.iter().copied());
    Harness::try_parse_from(argv)
        .expect("arguments should parse")
        .overrides
}

#[rstest]
fn cli_paths_take_precedence_over_named_options() {
    let overrides = parse(&[
        "--pid-file",
        "/tmp/cli.pid",
        "--log-file",
        "/tmp/cli.log",
    ]);
    let config = Config::new("svc")
        .with_pid_file("/srv/svc.pid")
        .with_log_file("/srv/svc.log")
        .apply_overrides(&overrides);

    assert_eq!(config.pid_file(), Utf8Path::new("/tmp/cli.pid"));
    assert_eq!(config.log_file(), Utf8Path::new("/tmp/cli.log"));
}

#[rstest]
fn logging_flags_override_defaults() {
    let overrides = parse(&["--log-filter", "debug", "--log-format", "json"]);
    let config = Config::default().apply_overrides(&overrides);

    assert_eq!(config.log_filter(), "debug");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn exclusive_flag_hardens_marker_policy() {
    let overrides = parse(&["--exclusive-marker"]);
    let config = Config::default().apply_overrides(&overrides);

    assert_eq!(config.marker_policy(), MarkerPolicy::Exclusive);
}

#[rstest]
fn unknown_log_format_is_rejected() {
    let argv = ["tether", "--log-format", "yaml"];
    let result = Harness::try_parse_from(argv);
    assert!(result.is_err(), "yaml is not a supported log format");
}
