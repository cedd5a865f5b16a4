// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawSettingsFile, SettingsFile};
use crate::errors::Result;
use crate::fs::FileSystem;

/// File name looked up in the workspace root when no path is given.
pub const SETTINGS_FILE_NAME: &str = ".checkrunner.toml";

/// Load a settings file and return the raw `RawSettingsFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawSettingsFile> {
    let contents = fs.read_to_string(path.as_ref())?;
    let settings: RawSettingsFile = toml::from_str(&contents)?;
    Ok(settings)
}

/// Load a settings file from path and run validation.
pub fn load_and_validate(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<SettingsFile> {
    let raw = load_from_path(fs, path)?;
    SettingsFile::try_from(raw)
}

/// Load the settings file if it exists, falling back to defaults.
///
/// An explicitly given path must exist; the default location is optional.
pub fn load_or_default(
    fs: &dyn FileSystem,
    explicit: Option<&Path>,
    workspace: Option<&Path>,
) -> Result<SettingsFile> {
    if let Some(path) = explicit {
        return load_and_validate(fs, path);
    }

    match workspace.map(default_settings_path) {
        Some(path) if fs.is_file(&path) => {
            debug!(path = %path.display(), "loading workspace settings");
            load_and_validate(fs, path)
        }
        _ => {
            debug!("no settings file found; using defaults");
            Ok(SettingsFile::default())
        }
    }
}

/// `.checkrunner.toml` in the workspace root.
pub fn default_settings_path(workspace: &Path) -> PathBuf {
    workspace.join(SETTINGS_FILE_NAME)
}
