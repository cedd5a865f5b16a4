// src/bridge.rs

//! High-level operations on top of the execution queue.
//!
//! `ExecutorBridge` builds command lines from the resolved settings, submits
//! processes with the right enqueue mode, and collects output for the
//! subcommands whose stdout is data (checker listing, parse results).
//!
//! Every operation first makes sure a supported tool version is installed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::command::{
    DatabaseLocator, MINIMUM_SUPPORTED_VERSION, ToolVersion, analyze_args, checkers_args,
    log_args, parse_args, parse_version_output, version_args,
};
use crate::config::Settings;
use crate::errors::{BuildError, CheckrunnerError, Result};
use crate::exec::{CollectedOutput, collect_output, wait_for_end};
use crate::process::{ManagedProcess, ProcessEvent, ProcessInfo, ProcessStatus};
use crate::queue::QueueHandle;
use crate::types::{EnqueueMode, ProcessCategory};

/// Outcome of the last version check, shared with callers that waited on it.
#[derive(Debug, Default)]
struct VersionState {
    supported: Option<ToolVersion>,
    last_error: Option<String>,
}

/// A process handed to the queue, followed until it ends.
#[derive(Debug)]
pub struct SubmittedRun {
    pub info: ProcessInfo,
    events: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl SubmittedRun {
    /// How the run ended. `None` if the queue dropped it in favour of an
    /// identical entry that was already queued.
    pub async fn finish(self) -> Option<ProcessStatus> {
        wait_for_end(self.events).await
    }
}

pub struct ExecutorBridge {
    queue: QueueHandle,
    settings: RwLock<Arc<Settings>>,
    locator: DatabaseLocator,
    version: Mutex<VersionState>,
    /// Bumped under the `version` lock each time a check completes.
    completed_checks: AtomicU64,
}

impl std::fmt::Debug for ExecutorBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorBridge")
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

impl ExecutorBridge {
    pub fn new(queue: QueueHandle, settings: Settings, locator: DatabaseLocator) -> Self {
        Self {
            queue,
            settings: RwLock::new(Arc::new(settings)),
            locator,
            version: Mutex::new(VersionState::default()),
            completed_checks: AtomicU64::new(0),
        }
    }

    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    pub fn settings(&self) -> Arc<Settings> {
        match self.settings.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in new settings. A changed executable invalidates the cached
    /// version.
    pub async fn update_settings(&self, settings: Settings) {
        let executable_changed = self.settings().executable_path() != settings.executable_path();

        match self.settings.write() {
            Ok(mut guard) => *guard = Arc::new(settings),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(settings),
        }

        if executable_changed {
            info!("executable changed; version will be checked again");
            *self.version.lock().await = VersionState::default();
        }
    }

    fn new_process(&self, args: Vec<String>, category: ProcessCategory) -> ManagedProcess {
        ManagedProcess::with_category(self.settings().executable_path(), args, category)
    }

    /// Return the supported tool version, running a check if none is cached.
    ///
    /// Concurrent callers wait for the check already in flight and get its
    /// result. Failures are not cached: the next call after one checks again.
    /// Without a workspace the check could never start, so it is refused.
    pub async fn ensure_version(&self) -> Result<ToolVersion> {
        if self.settings().workspace_folder().is_none() {
            return Err(BuildError::NoWorkspace.into());
        }

        let seen = self.completed_checks.load(Ordering::SeqCst);
        let mut state = self.version.lock().await;

        if let Some(version) = state.supported {
            return Ok(version);
        }

        // A check finished while we waited for the lock; share its failure.
        if self.completed_checks.load(Ordering::SeqCst) != seen {
            if let Some(err) = &state.last_error {
                return Err(CheckrunnerError::VersionCheckFailed(err.clone()));
            }
        }

        let result = self.run_version_check().await;
        match &result {
            Ok(version) => {
                state.supported = Some(*version);
                state.last_error = None;
            }
            Err(err) => state.last_error = Some(err.to_string()),
        }
        self.completed_checks.fetch_add(1, Ordering::SeqCst);

        result
    }

    async fn run_version_check(&self) -> Result<ToolVersion> {
        let mut process = self.new_process(version_args(), ProcessCategory::Version);
        let events = process.subscribe();

        debug!(cmd = %process.command_line(), "checking analyzer version");
        self.queue.add_to_queue(process, EnqueueMode::Replace).await?;

        let output = collect_output(events).await;
        if !output.finished() {
            warn!(status = ?output.status, "version check did not finish");
            return Err(CheckrunnerError::VersionCheckFailed(describe_end(&output)));
        }

        let version = parse_version_output(&output.stdout)?;
        if !version.is_supported() {
            warn!(%version, minimum = %MINIMUM_SUPPORTED_VERSION, "unsupported analyzer version");
            return Err(CheckrunnerError::UnsupportedVersion {
                found: version,
                minimum: MINIMUM_SUPPORTED_VERSION,
            });
        }

        info!(%version, "supported analyzer version, enabled");
        Ok(version)
    }

    async fn submit(&self, mut process: ManagedProcess, mode: EnqueueMode) -> Result<SubmittedRun> {
        let events = process.subscribe();
        let info = process.info();
        self.queue.add_to_queue(process, mode).await?;
        Ok(SubmittedRun { info, events })
    }

    /// Analyze each file separately, ahead of other queued analyses.
    pub async fn analyze_files(&self, files: &[PathBuf]) -> Result<Vec<SubmittedRun>> {
        let version = self.ensure_version().await?;
        let settings = self.settings();

        let mut runs = Vec::with_capacity(files.len());
        for file in files {
            let args = analyze_args(&settings, &self.locator, Some(version), std::slice::from_ref(file))?;
            let process = self.new_process(args, ProcessCategory::Analyze);
            runs.push(self.submit(process, EnqueueMode::Prepend).await?);
        }

        Ok(runs)
    }

    /// Analyze a just-saved file, if analysis on save is enabled.
    pub async fn analyze_on_save(&self, file: PathBuf) -> Result<Vec<SubmittedRun>> {
        if !self.settings().run_on_save() {
            debug!(file = %file.display(), "analysis on save disabled");
            return Ok(Vec::new());
        }
        self.analyze_files(&[file]).await
    }

    /// Analyze the whole project. Pending analyses and logs are dropped since
    /// this run covers them.
    pub async fn analyze_project(&self) -> Result<SubmittedRun> {
        let version = self.ensure_version().await?;
        self.stop_and_clear_queue().await?;

        let args = analyze_args(&self.settings(), &self.locator, Some(version), &[])?;
        let process = self.new_process(args, ProcessCategory::Analyze);
        self.submit(process, EnqueueMode::Replace).await
    }

    /// Record a build into the compilation database. Anything that would read
    /// the database being rewritten is stopped first.
    pub async fn run_log(&self, build_command: Option<&str>) -> Result<SubmittedRun> {
        self.ensure_version().await?;
        self.stop_and_clear_queue().await?;

        let args = log_args(&self.settings(), &self.locator, build_command)?;
        let process = self.new_process(args, ProcessCategory::Log);
        self.submit(process, EnqueueMode::Replace).await
    }

    /// List checkers as raw JSON. `None` if the run did not finish cleanly.
    pub async fn reload_checker_data(&self) -> Result<Option<String>> {
        self.ensure_version().await?;
        let process = self.new_process(checkers_args(), ProcessCategory::Checkers);
        self.run_collecting(process).await
    }

    /// Parse stored reports (optionally limited to `files`) as raw JSON.
    /// `None` if the run did not finish cleanly.
    pub async fn parse_reports(&self, files: &[PathBuf]) -> Result<Option<String>> {
        self.ensure_version().await?;
        let args = parse_args(&self.settings(), files)?;
        let process = self.new_process(args, ProcessCategory::Parse);
        self.run_collecting(process).await
    }

    async fn run_collecting(&self, mut process: ManagedProcess) -> Result<Option<String>> {
        let events = process.subscribe();
        let category = process.category();
        self.queue.add_to_queue(process, EnqueueMode::Replace).await?;

        let output = collect_output(events).await;
        if output.finished() {
            Ok(Some(output.stdout))
        } else {
            info!(%category, end = %describe_end(&output), "no output collected");
            Ok(None)
        }
    }

    /// Drop queued analyses and logs, and kill the active one of those.
    pub async fn stop_and_clear_queue(&self) -> Result<()> {
        self.queue.clear_queue(Some(ProcessCategory::Analyze)).await?;
        self.queue.clear_queue(Some(ProcessCategory::Log)).await?;
        self.queue
            .kill_process_in(vec![ProcessCategory::Analyze, ProcessCategory::Log])
            .await
    }

    /// Drop queued parse runs and kill an active one.
    pub async fn stop_metadata_tasks(&self) -> Result<()> {
        self.queue.clear_queue(Some(ProcessCategory::Parse)).await?;
        self.queue.kill_process_in(vec![ProcessCategory::Parse]).await
    }

    /// Kill whatever is running.
    pub async fn stop(&self) -> Result<()> {
        self.queue.kill_process().await
    }
}

fn describe_end(output: &CollectedOutput) -> String {
    match &output.status {
        Some(status) => format!("process ended with status {status}"),
        None => "process was dropped before it finished".to_string(),
    }
}
