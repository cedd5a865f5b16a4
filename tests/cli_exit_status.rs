// tests/cli_exit_status.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use clap::Parser;
use tempfile::TempDir;

use checkrunner::cli::CliArgs;

type TestResult = Result<(), Box<dyn Error>>;

/// A stand-in analyzer: answers the version query, then behaves per
/// subcommand with the given shell snippets.
const TOOL: &str = r#"#!/bin/sh
case "$1" in
  analyzer-version) echo '{"base_package_version": "6.23.0"}' ;;
  analyze) ANALYZE ;;
  log) LOG ;;
esac
"#;

/// Workspace whose settings point at a generated tool script.
fn workspace(analyze: &str, log: &str) -> Result<TempDir, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let tool = dir.path().join("CodeChecker");
    fs::write(&tool, TOOL.replace("ANALYZE", analyze).replace("LOG", log))?;
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755))?;

    fs::write(
        dir.path().join(".checkrunner.toml"),
        format!("[executor]\nexecutable_path = {:?}\n", tool.display().to_string()),
    )?;
    Ok(dir)
}

fn args(workspace: &Path, command: &[&str]) -> Result<CliArgs, clap::Error> {
    let mut argv = vec!["checkrunner", "--workspace"];
    let ws = workspace.to_str().unwrap_or_default();
    argv.push(ws);
    argv.extend_from_slice(command);
    CliArgs::try_parse_from(argv)
}

// Scripts are all written before any process is spawned, so no child can
// inherit a still-open handle to one (ETXTBSY).
#[tokio::test]
async fn exit_status_follows_the_submitted_runs() -> TestResult {
    init_tracing();

    let failing = workspace("echo '[ERROR 2024] - boom' >&2; exit 1", "exit 1")?;
    let passing = workspace("echo '[INFO 2024] - done' >&2; exit 2", "exit 0")?;

    // The version check finishing first must never mask the failed analysis.
    for _ in 0..5 {
        let result = with_timeout(checkrunner::run(args(failing.path(), &["analyze"])?)).await;
        let err = result.expect_err("a failed analysis fails the command");
        assert!(err.to_string().contains("errored"), "error: {err:#}");
    }

    let file = failing.path().join("a.c");
    let file = file.to_str().unwrap_or_default();
    let result = with_timeout(checkrunner::run(args(failing.path(), &["analyze", file])?)).await;
    assert!(result.is_err(), "per-file analysis failure is reported");

    let result = with_timeout(checkrunner::run(args(failing.path(), &["log", "--build", "true"])?)).await;
    assert!(result.is_err(), "failed log run is reported");

    with_timeout(checkrunner::run(args(passing.path(), &["analyze"])?)).await?;
    with_timeout(checkrunner::run(args(passing.path(), &["log", "--build", "true"])?)).await?;
    Ok(())
}
