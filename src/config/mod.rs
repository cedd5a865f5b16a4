// src/config/mod.rs

//! Settings loading, validation and resolution for checkrunner.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a settings file through the `FileSystem` abstraction (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Substitute `${...}` variables (`vars.rs`) and expose typed, resolved
//!   values (`resolver.rs`).

pub mod loader;
pub mod model;
pub mod resolver;
pub mod validate;
pub mod vars;

pub use loader::{SETTINGS_FILE_NAME, load_and_validate, load_from_path, load_or_default};
pub use model::{BackendSection, ExecutorSection, QueueSection, RawSettingsFile, SettingsFile};
pub use resolver::{ConfigResolver, Settings};
pub use vars::VariableContext;
