// src/command/mod.rs

//! Command lines for the external analysis tool.
//!
//! - [`args`] builds argument vectors per subcommand.
//! - [`database`] finds the compilation database.
//! - [`version`] models and parses the tool's version report.

pub mod args;
pub mod database;
pub mod version;

pub use args::{analyze_args, checkers_args, log_args, parse_args, version_args};
pub use database::{DatabaseLocator, candidate_paths};
pub use version::{
    BUILTIN_RESOLVER_VERSION, MINIMUM_SUPPORTED_VERSION, ToolVersion, VersionError,
    parse_version_output,
};
