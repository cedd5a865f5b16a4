// src/command/version.rs

//! Analyzer version model and parsing of `analyzer-version --output json`.
//!
//! Newer tools print `{"base_package_version": "6.23.1", ...}`. Before 6.19
//! the key was `"Base package version"`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Oldest tool version that can be driven at all.
pub const MINIMUM_SUPPORTED_VERSION: ToolVersion = ToolVersion::new(6, 18, 2);

/// From this version on, the tool can resolve a compilation database itself
/// when given a source file or a project directory.
pub const BUILTIN_RESOLVER_VERSION: ToolVersion = ToolVersion::new(6, 22, 0);

const VERSION_KEYS: [&str; 2] = ["base_package_version", "Base package version"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("version output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("version output has no package version field")]
    MissingField,

    #[error("invalid version string {0:?}")]
    InvalidVersion(String),
}

/// `major.minor.patch` of the external tool. Ordered numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_supported(&self) -> bool {
        *self >= MINIMUM_SUPPORTED_VERSION
    }

    pub fn has_builtin_resolver(&self) -> bool {
        *self >= BUILTIN_RESOLVER_VERSION
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ToolVersion {
    type Err = VersionError;

    /// Accepts `M`, `M.m` and `M.m.p`; missing parts are zero. A non-numeric
    /// suffix on a part (e.g. `1-rc2`) is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidVersion(s.to_string());

        let mut parts = [0u32; 3];
        for (slot, part) in parts.iter_mut().zip(s.trim().split('.')) {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            *slot = digits.parse().map_err(|_| invalid())?;
        }

        Ok(ToolVersion::new(parts[0], parts[1], parts[2]))
    }
}

/// Extract the package version from the JSON version report.
///
/// Text before the first `{` (a banner line) is skipped.
pub fn parse_version_output(output: &str) -> Result<ToolVersion, VersionError> {
    let json = output
        .find('{')
        .map(|start| &output[start..])
        .ok_or_else(|| VersionError::InvalidJson("no JSON object in output".to_string()))?;

    let data: Value =
        serde_json::from_str(json.trim()).map_err(|e| VersionError::InvalidJson(e.to_string()))?;

    let version = VERSION_KEYS
        .iter()
        .find_map(|key| data.get(key).and_then(Value::as_str))
        .filter(|v| !v.is_empty())
        .ok_or(VersionError::MissingField)?;

    version.parse()
}
