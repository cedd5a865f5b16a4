#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use checkrunner::config::{RawSettingsFile, Settings, SettingsFile, VariableContext};
use checkrunner::process::ManagedProcess;
use checkrunner::types::ProcessCategory;

/// Builder for `Settings` to simplify test setup.
///
/// The variable context is fixed: `cwd` is the workspace and the environment
/// only contains what was added with [`SettingsBuilder::env`].
pub struct SettingsBuilder {
    raw: RawSettingsFile,
    workspace: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl SettingsBuilder {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            raw: RawSettingsFile::default(),
            workspace: Some(workspace.as_ref().to_path_buf()),
            env: HashMap::new(),
        }
    }

    /// Settings evaluated without an open workspace.
    pub fn without_workspace() -> Self {
        Self {
            raw: RawSettingsFile::default(),
            workspace: None,
            env: HashMap::new(),
        }
    }

    pub fn executable(mut self, path: &str) -> Self {
        self.raw.executor.executable_path = Some(path.to_string());
        self
    }

    pub fn arguments(mut self, args: &str) -> Self {
        self.raw.executor.arguments = Some(args.to_string());
        self
    }

    pub fn thread_count(mut self, n: u32) -> Self {
        self.raw.executor.thread_count = Some(n);
        self
    }

    pub fn log_build_command(mut self, cmd: &str) -> Self {
        self.raw.executor.log_build_command = Some(cmd.to_string());
        self
    }

    pub fn log_arguments(mut self, args: &str) -> Self {
        self.raw.executor.log_arguments = Some(args.to_string());
        self
    }

    pub fn run_on_save(mut self, enabled: bool) -> Self {
        self.raw.executor.run_on_save = enabled;
        self
    }

    pub fn output_folder(mut self, folder: &str) -> Self {
        self.raw.backend.output_folder = Some(folder.to_string());
        self
    }

    pub fn database(mut self, path: &str) -> Self {
        self.raw.backend.compilation_database_path = Some(path.to_string());
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn build_file(&self) -> SettingsFile {
        SettingsFile::try_from(self.raw.clone()).expect("test settings must be valid")
    }

    pub fn build(self) -> Settings {
        let file = self.build_file();
        let cwd = self.workspace.clone().unwrap_or_else(|| PathBuf::from("/"));
        Settings::new(file, VariableContext::with_env(self.workspace, cwd, self.env))
    }
}

/// A process running `tool` with the given arguments.
pub fn process(category: ProcessCategory, args: &[&str]) -> ManagedProcess {
    ManagedProcess::with_category("tool", args.iter().copied(), category)
}
