// src/config/model.rs

use serde::Deserialize;

use crate::queue::broadcast::DEFAULT_BROADCAST_CAPACITY;

/// Settings file as read from TOML, before validation.
///
/// ```toml
/// [executor]
/// executable_path = "~/codechecker/bin/CodeChecker"
/// arguments = "--analyzers clangsa"
/// thread_count = 4
/// log_build_command = "make -j4"
///
/// [backend]
/// output_folder = "${workspaceFolder}/.codechecker"
/// compilation_database_path = "${workspaceFolder}/build/compile_commands.json"
///
/// [queue]
/// broadcast_capacity = 1024
/// ```
///
/// All sections are optional and have reasonable defaults. String values
/// may contain `${workspaceFolder}`-style variables; they are substituted
/// when read through [`crate::config::Settings`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettingsFile {
    #[serde(default)]
    pub executor: ExecutorSection,

    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub queue: QueueSection,
}

/// Validated settings file. Build it with `SettingsFile::try_from(raw)`.
#[derive(Debug, Clone, Default)]
pub struct SettingsFile {
    pub executor: ExecutorSection,
    pub backend: BackendSection,
    pub queue: QueueSection,
}

impl SettingsFile {
    pub(crate) fn new_unchecked(raw: RawSettingsFile) -> Self {
        Self {
            executor: raw.executor,
            backend: raw.backend,
            queue: raw.queue,
        }
    }
}

/// `[executor]` section: how the tool is invoked.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSection {
    /// Path or name of the tool executable. Empty means `CodeChecker`.
    #[serde(default)]
    pub executable_path: Option<String>,

    /// Extra arguments appended to `analyze`, as a shell-style string.
    #[serde(default)]
    pub arguments: Option<String>,

    /// Passed as `-j <n>` to `analyze`.
    #[serde(default)]
    pub thread_count: Option<u32>,

    /// Build command wrapped by `log`. Defaults to `make`.
    #[serde(default)]
    pub log_build_command: Option<String>,

    /// Extra arguments for `log`, as a shell-style string.
    #[serde(default)]
    pub log_arguments: Option<String>,

    /// Analyze a file whenever it is saved.
    #[serde(default = "default_run_on_save")]
    pub run_on_save: bool,
}

fn default_run_on_save() -> bool {
    true
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            executable_path: None,
            arguments: None,
            thread_count: None,
            log_build_command: None,
            log_arguments: None,
            run_on_save: default_run_on_save(),
        }
    }
}

/// `[backend]` section: where results and the compilation database live.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    /// Defaults to `${workspaceFolder}/.codechecker`.
    #[serde(default)]
    pub output_folder: Option<String>,

    /// Checked before any of the conventional database locations.
    #[serde(default)]
    pub compilation_database_path: Option<String>,
}

/// `[queue]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSection {
    /// Buffer size of each broadcast stream. Slow subscribers that fall
    /// further behind than this lose events.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}
