// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::command::version::{ToolVersion, VersionError};

#[derive(Error, Debug)]
pub enum CheckrunnerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Execution queue is no longer running")]
    QueueClosed,

    #[error("Cannot build command line: {0}")]
    Build(#[from] BuildError),

    #[error("Cannot determine analyzer version: {0}")]
    Version(#[from] VersionError),

    #[error("Unsupported analyzer version {found} (minimum supported: {minimum})")]
    UnsupportedVersion {
        found: ToolVersion,
        minimum: ToolVersion,
    },

    #[error("Version check failed: {0}")]
    VersionCheckFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reasons why a command line for the external tool cannot be assembled.
///
/// These are expected, user-facing conditions rather than bugs: callers check
/// for them before a process is ever created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no workspace folder is open")]
    NoWorkspace,

    #[error("no compilation database found (searched {} location(s))", searched.len())]
    NoCompilationDatabase { searched: Vec<PathBuf> },

    #[error("analyzing multiple files at once is only supported with a compilation database")]
    MultipleFilesNeedDatabase,

    #[error("the analyzer version has not been determined")]
    VersionUnknown,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CheckrunnerError>;
