// src/logging.rs

//! Diagnostics for `checkrunner` via `tracing` + `tracing-subscriber`.
//!
//! Which events are shown:
//! 1. `--log-level` sets one level for checkrunner's own targets
//! 2. otherwise `CHECKRUNNER_LOG` is read as an `EnvFilter` directive string
//!    (`debug`, `checkrunner::queue=trace,notify=debug`, ...)
//! 3. otherwise `info`
//!
//! Dependencies stay at `warn` unless a directive names them. Everything is
//! written to STDERR: stdout carries tool output and JSON results.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "CHECKRUNNER_LOG";

const CRATE_TARGET: &str = "checkrunner";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => crate_filter(level_from_log_level(level)),
        None => match std::env::var(LOG_ENV_VAR) {
            Ok(directives) if !directives.trim().is_empty() => env_filter(&directives)?,
            _ => crate_filter(Level::INFO),
        },
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

/// `warn` globally, `level` for checkrunner itself.
fn crate_filter(level: Level) -> EnvFilter {
    EnvFilter::new(format!(
        "warn,{CRATE_TARGET}={}",
        level.as_str().to_lowercase()
    ))
}

/// A bare level such as `debug` applies to checkrunner only; anything else
/// is taken as a full directive string.
fn env_filter(directives: &str) -> Result<EnvFilter> {
    if let Some(level) = parse_level_str(directives) {
        return Ok(crate_filter(level));
    }
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid {LOG_ENV_VAR} directives {directives:?}"))
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

/// Parse a bare level name, case-insensitively.
pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
