// src/command/args.rs

//! Argument vectors for each tool subcommand.
//!
//! Builders fail with a [`BuildError`] when the command cannot be assembled
//! (no workspace, no database); callers surface that instead of spawning.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::database::DatabaseLocator;
use crate::command::version::ToolVersion;
use crate::config::Settings;
use crate::errors::{BuildError, Result};

/// File name used for the database `log` writes when none exists yet.
pub const DEFAULT_DATABASE_FILE_NAME: &str = "compile_commands.json";

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn file_args(files: &[PathBuf]) -> Vec<String> {
    if files.is_empty() {
        return Vec::new();
    }
    std::iter::once("--file".to_string())
        .chain(files.iter().map(|f| path_arg(f)))
        .collect()
}

/// `analyzer-version --output json`
pub fn version_args() -> Vec<String> {
    ["analyzer-version", "--output", "json"]
        .map(String::from)
        .to_vec()
}

/// `checkers --details --output json`
pub fn checkers_args() -> Vec<String> {
    ["checkers", "--details", "--output", "json"]
        .map(String::from)
        .to_vec()
}

/// `parse <reports> -e json [--file F..]`
pub fn parse_args(settings: &Settings, files: &[PathBuf]) -> Result<Vec<String>> {
    let reports = settings.reports_folder().ok_or(BuildError::NoWorkspace)?;

    let mut args = vec![
        "parse".to_string(),
        path_arg(&reports),
        "-e".to_string(),
        "json".to_string(),
    ];
    args.extend(file_args(files));
    Ok(args)
}

/// `log <log args> --output <db> --build <build command>`
///
/// The database goes to the located one, or to
/// `<output folder>/compile_commands.json` if none exists yet.
pub fn log_args(
    settings: &Settings,
    locator: &DatabaseLocator,
    build_command: Option<&str>,
) -> Result<Vec<String>> {
    let output_folder = settings.output_folder().ok_or(BuildError::NoWorkspace)?;

    let configured = settings.compilation_database_path();
    let database = locator
        .locate(configured.as_deref(), None)
        .unwrap_or_else(|_| output_folder.join(DEFAULT_DATABASE_FILE_NAME));

    let mut args = vec!["log".to_string()];
    args.extend(settings.log_arguments()?);
    args.extend([
        "--output".to_string(),
        path_arg(&database),
        "--build".to_string(),
        settings.log_build_command(build_command),
    ]);
    Ok(args)
}

/// `analyze --output <reports> [-j N] <db-or-target> [--file F..] <extra args>`
///
/// Tools older than 6.22.0 always need a located database. Newer tools use
/// an explicitly configured database when present, and otherwise resolve it
/// themselves from the workspace root (no files) or the single file given.
/// Several files without a configured database fall back to the
/// conventional locations.
pub fn analyze_args(
    settings: &Settings,
    locator: &DatabaseLocator,
    version: Option<ToolVersion>,
    files: &[PathBuf],
) -> Result<Vec<String>> {
    let workspace = settings.workspace_folder().ok_or(BuildError::NoWorkspace)?;
    let reports = settings.reports_folder().ok_or(BuildError::NoWorkspace)?;
    let version = version.ok_or(BuildError::VersionUnknown)?;
    let configured = settings.compilation_database_path();

    let mut args = vec![
        "analyze".to_string(),
        "--output".to_string(),
        path_arg(&reports),
    ];

    if let Some(threads) = settings.thread_count() {
        args.extend(["-j".to_string(), threads.to_string()]);
    }

    if !version.has_builtin_resolver() {
        let database = locator.locate(configured.as_deref(), Some(workspace))?;
        args.push(path_arg(&database));
        args.extend(file_args(files));
    } else if let Ok(database) = locator.locate(configured.as_deref(), None) {
        args.push(path_arg(&database));
        args.extend(file_args(files));
    } else {
        match files {
            [] => {
                info!("using the tool's built-in compilation database resolver for the project");
                args.push(path_arg(workspace));
            }
            [file] => {
                info!(file = %file.display(), "using the tool's built-in compilation database resolver");
                args.push(path_arg(file));
            }
            _ => {
                let database = locator
                    .locate(configured.as_deref(), Some(workspace))
                    .map_err(|_| BuildError::MultipleFilesNeedDatabase)?;
                args.push(path_arg(&database));
                args.extend(file_args(files));
            }
        }
    }

    args.extend(settings.analyze_arguments()?);
    Ok(args)
}
