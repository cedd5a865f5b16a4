// src/config/validate.rs

use crate::config::model::{RawSettingsFile, SettingsFile};
use crate::errors::{CheckrunnerError, Result};

impl TryFrom<RawSettingsFile> for SettingsFile {
    type Error = CheckrunnerError;

    fn try_from(raw: RawSettingsFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(SettingsFile::new_unchecked(raw))
    }
}

fn validate_raw_settings(cfg: &RawSettingsFile) -> Result<()> {
    validate_executor(cfg)?;
    validate_queue(cfg)?;
    Ok(())
}

fn validate_executor(cfg: &RawSettingsFile) -> Result<()> {
    if cfg.executor.thread_count == Some(0) {
        return Err(CheckrunnerError::ConfigError(
            "[executor].thread_count must be >= 1 (got 0)".to_string(),
        ));
    }

    for (key, value) in [
        ("arguments", &cfg.executor.arguments),
        ("log_arguments", &cfg.executor.log_arguments),
    ] {
        if let Some(value) = value {
            shell_words::split(value).map_err(|e| {
                CheckrunnerError::ConfigError(format!(
                    "[executor].{key} is not a valid shell argument string: {e}"
                ))
            })?;
        }
    }

    Ok(())
}

fn validate_queue(cfg: &RawSettingsFile) -> Result<()> {
    if cfg.queue.broadcast_capacity == 0 {
        return Err(CheckrunnerError::ConfigError(
            "[queue].broadcast_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
