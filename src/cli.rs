// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `checkrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "checkrunner",
    version,
    about = "Queue and run CodeChecker analyses for a workspace.",
    long_about = None
)]
pub struct CliArgs {
    /// Workspace root; processes run here and `${workspaceFolder}` expands
    /// to it.
    ///
    /// Default: the current working directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Path to the settings file (TOML).
    ///
    /// Default: `.checkrunner.toml` in the workspace, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CHECKRUNNER_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the analyzer version, checking that it is supported.
    Version,

    /// Analyze the given files, or the whole project when none are given.
    Analyze {
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Record a build into the compilation database.
    Log {
        /// Build command to wrap. Default: the configured one, or `make`.
        #[arg(long, value_name = "CMD")]
        build: Option<String>,
    },

    /// Print stored reports as JSON, optionally only for the given files.
    Parse {
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Print the available checkers as JSON.
    Checkers,
}

impl Command {
    /// Commands whose tool stdout is progress output rather than data.
    pub fn streams_tool_stdout(&self) -> bool {
        matches!(self, Command::Analyze { .. } | Command::Log { .. })
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
