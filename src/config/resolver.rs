// src/config/resolver.rs

//! Resolved settings: the validated file combined with the workspace.

use std::path::{Path, PathBuf};

use crate::config::model::SettingsFile;
use crate::config::vars::VariableContext;
use crate::errors::Result;

/// Executable used when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "CodeChecker";

/// Build command wrapped by `log` when none is configured.
pub const DEFAULT_BUILD_COMMAND: &str = "make";

/// Name of the folder holding results inside the workspace.
pub const DEFAULT_OUTPUT_FOLDER: &str = ".codechecker";

/// Lookup of a single settings value by section and key, with variables
/// already substituted.
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, section: &str, key: &str) -> Option<String>;
}

/// Settings file plus the variable context it is evaluated in.
#[derive(Debug, Clone)]
pub struct Settings {
    file: SettingsFile,
    vars: VariableContext,
}

impl Settings {
    pub fn new(file: SettingsFile, vars: VariableContext) -> Self {
        Self { file, vars }
    }

    pub fn file(&self) -> &SettingsFile {
        &self.file
    }

    pub fn workspace_folder(&self) -> Option<&Path> {
        self.vars.workspace_folder()
    }

    pub fn vars(&self) -> &VariableContext {
        &self.vars
    }

    fn raw_value(&self, section: &str, key: &str) -> Option<String> {
        let executor = &self.file.executor;
        let backend = &self.file.backend;

        match (section, key) {
            ("executor", "executable_path") => executor.executable_path.clone(),
            ("executor", "arguments") => executor.arguments.clone(),
            ("executor", "thread_count") => executor.thread_count.map(|n| n.to_string()),
            ("executor", "log_build_command") => executor.log_build_command.clone(),
            ("executor", "log_arguments") => executor.log_arguments.clone(),
            ("executor", "run_on_save") => Some(executor.run_on_save.to_string()),
            ("backend", "output_folder") => backend.output_folder.clone(),
            ("backend", "compilation_database_path") => backend.compilation_database_path.clone(),
            ("queue", "broadcast_capacity") => Some(self.file.queue.broadcast_capacity.to_string()),
            _ => None,
        }
    }

    /// Tool executable; `CodeChecker` when unset or empty.
    pub fn executable_path(&self) -> String {
        self.resolve("executor", "executable_path")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string())
    }

    /// Extra `analyze` arguments.
    pub fn analyze_arguments(&self) -> Result<Vec<String>> {
        self.shell_args(self.file.executor.arguments.as_deref())
    }

    /// Extra `log` arguments.
    pub fn log_arguments(&self) -> Result<Vec<String>> {
        self.shell_args(self.file.executor.log_arguments.as_deref())
    }

    fn shell_args(&self, value: Option<&str>) -> Result<Vec<String>> {
        self.vars.parse_shell_args(value.unwrap_or_default())
    }

    pub fn thread_count(&self) -> Option<u32> {
        self.file.executor.thread_count
    }

    /// The build command for `log`: `explicit` if given, else the configured
    /// one, else `make`.
    pub fn log_build_command(&self, explicit: Option<&str>) -> String {
        let resolved = match explicit {
            Some(command) => self.vars.replace_variables(command),
            None => self.resolve("executor", "log_build_command"),
        };
        resolved.unwrap_or_else(|| DEFAULT_BUILD_COMMAND.to_string())
    }

    pub fn run_on_save(&self) -> bool {
        self.file.executor.run_on_save
    }

    /// Folder for results; `None` without a workspace.
    pub fn output_folder(&self) -> Option<PathBuf> {
        self.resolve("backend", "output_folder")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                self.workspace_folder()
                    .map(|w| w.join(DEFAULT_OUTPUT_FOLDER))
            })
    }

    /// `<output folder>/reports`.
    pub fn reports_folder(&self) -> Option<PathBuf> {
        self.output_folder().map(|f| f.join("reports"))
    }

    /// Explicitly configured compilation database, if any.
    pub fn compilation_database_path(&self) -> Option<PathBuf> {
        self.resolve("backend", "compilation_database_path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    pub fn broadcast_capacity(&self) -> usize {
        self.file.queue.broadcast_capacity
    }
}

impl ConfigResolver for Settings {
    fn resolve(&self, section: &str, key: &str) -> Option<String> {
        let raw = self.raw_value(section, key)?;
        self.vars.replace_variables(&raw)
    }
}
