//! Shared test utilities for strata-cli integration tests.

use assert_cmd::Command;

/// Get a Command for the strata binary with a clean environment.
///
/// # Panics
///
/// Panics if the strata binary cannot be found.
#[allow(deprecated)]
pub fn strata_cmd() -> Command {
    let mut cmd = Command::cargo_bin("strata").expect("strata binary should exist");
    cmd.env_remove("STRATA_CONFIG")
        .env_remove("STRATA_VERBOSE")
        .env_remove("STRATA_QUIET")
        .env("STRATA_COLOR", "never");
    cmd
}

/// Run a command expected to succeed and parse its stdout as JSON.
pub fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout should be JSON")
}
