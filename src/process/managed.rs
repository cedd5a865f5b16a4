// src/process/managed.rs

//! A single, single-use invocation of the external tool.
//!
//! `ManagedProcess` is a synchronous state machine: it never touches the OS
//! itself. Lifecycle methods return a [`ProcessStep`] describing the events
//! that were emitted and the OS-level actions (spawn / interrupt) the caller
//! has to carry out. The real spawning lives in [`crate::exec`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::process::classify::{self, classify_exit, classify_spawn_error};
use crate::process::status::{ProcessStatus, StatusKind};
use crate::types::ProcessCategory;

static NEXT_PROCESS_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id of a process instance, used to route OS events back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl ProcessId {
    fn next() -> Self {
        ProcessId(NEXT_PROCESS_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which pipe a chunk of output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Event emitted by a process to its observers.
///
/// Output chunks arrive as read from the pipe: a chunk may hold several
/// lines or end mid-line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    /// Stderr of the tool, plus `> command` and `>>> metadata` lines.
    Stderr(String),
    Status(ProcessStatus),
}

/// What the OS layer needs to start a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub id: ProcessId,
    pub category: ProcessCategory,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// OS-level side effect requested by a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessAction {
    Spawn(SpawnRequest),
    /// Send an interrupt signal. There is no escalation to a forceful kill.
    Interrupt(ProcessId),
}

/// Result of a single lifecycle transition.
#[derive(Debug, Default)]
pub struct ProcessStep {
    pub events: Vec<ProcessEvent>,
    pub actions: Vec<ProcessAction>,
}

impl ProcessStep {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.actions.is_empty()
    }

    /// Statuses contained in this step, in emission order.
    pub fn statuses(&self) -> impl Iterator<Item = &ProcessStatus> {
        self.events.iter().filter_map(|e| match e {
            ProcessEvent::Status(s) => Some(s),
            _ => None,
        })
    }
}

/// Construction parameters for a [`ManagedProcess`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    pub category: ProcessCategory,
    /// Forward stdout to the shared log streams. Defaults per category.
    pub forward_stdout: Option<bool>,
}

impl ProcessOptions {
    pub fn new(category: ProcessCategory) -> Self {
        Self {
            category,
            forward_stdout: None,
        }
    }
}

/// Identity of a process inside the queue: its category plus its command
/// signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessKey {
    pub category: ProcessCategory,
    pub command_line: String,
}

/// Lightweight description of a process, paired with queue-level events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub id: ProcessId,
    pub category: ProcessCategory,
    pub command_line: String,
}

impl ProcessInfo {
    pub fn key(&self) -> ProcessKey {
        ProcessKey {
            category: self.category,
            command_line: self.command_line.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Detached,
    Running,
    Terminal(StatusKind),
    Disposed,
}

/// A single invocation of the external tool.
///
/// Two processes are equal when their command signatures are equal,
/// regardless of instance identity.
pub struct ManagedProcess {
    id: ProcessId,
    executable: String,
    args: Vec<String>,
    category: ProcessCategory,
    forward_stdout: bool,
    command_line: String,
    lifecycle: Lifecycle,
    last_log_line: Option<String>,
    observers: Vec<mpsc::UnboundedSender<ProcessEvent>>,
}

impl fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("command_line", &self.command_line)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ManagedProcess {
    fn eq(&self, other: &Self) -> bool {
        self.command_line == other.command_line
    }
}

impl Eq for ManagedProcess {}

impl ManagedProcess {
    pub fn new(executable: impl Into<String>, args: Vec<String>, options: ProcessOptions) -> Self {
        let executable = expand_user(&executable.into());
        let command_line = command_signature(&executable, &args);
        let forward_stdout = options
            .forward_stdout
            .unwrap_or_else(|| options.category.forwards_stdout_by_default());

        Self {
            id: ProcessId::next(),
            executable,
            args,
            category: options.category,
            forward_stdout,
            command_line,
            lifecycle: Lifecycle::Detached,
            last_log_line: None,
            observers: Vec::new(),
        }
    }

    /// Convenience constructor using the category's default forwarding.
    pub fn with_category<I, S>(executable: impl Into<String>, args: I, category: ProcessCategory) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        Self::new(executable, args, ProcessOptions::new(category))
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn category(&self) -> ProcessCategory {
        self.category
    }

    pub fn forwards_stdout(&self) -> bool {
        self.forward_stdout
    }

    /// Shell-quoted executable and arguments; the command signature.
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn key(&self) -> ProcessKey {
        ProcessKey {
            category: self.category,
            command_line: self.command_line.clone(),
        }
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            id: self.id,
            category: self.category,
            command_line: self.command_line.clone(),
        }
    }

    /// Last log line captured for outcome classification.
    pub fn last_log_line(&self) -> Option<&str> {
        self.last_log_line.as_deref()
    }

    pub fn status_kind(&self) -> StatusKind {
        match self.lifecycle {
            Lifecycle::Detached => StatusKind::NotRunning,
            Lifecycle::Running => StatusKind::Running,
            Lifecycle::Terminal(kind) => kind,
            Lifecycle::Disposed => StatusKind::Removed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle == Lifecycle::Disposed
    }

    /// Attach an observer receiving every event of this instance.
    ///
    /// The channel closes once the process is disposed.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ProcessEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.lifecycle != Lifecycle::Disposed {
            self.observers.push(tx);
        }
        rx
    }

    /// Start the process in `cwd`.
    ///
    /// No-op if the process already ran, or if there is no workspace to use
    /// as working directory.
    pub fn start(&mut self, cwd: Option<&Path>) -> ProcessStep {
        let mut step = ProcessStep::default();

        if self.lifecycle != Lifecycle::Detached {
            return step;
        }

        let Some(cwd) = cwd else {
            debug!(
                process_id = %self.id,
                category = %self.category,
                "no workspace folder; not starting process"
            );
            return step;
        };

        info!(
            process_id = %self.id,
            category = %self.category,
            cmd = %self.command_line,
            "starting process"
        );

        let starting = format!(">>> Starting process '{}'\n", self.category);
        let command = format!("> {}\n", self.command_line);
        self.emit(&mut step, ProcessEvent::Stderr(starting));
        self.emit(&mut step, ProcessEvent::Stderr(command));

        step.actions.push(ProcessAction::Spawn(SpawnRequest {
            id: self.id,
            category: self.category,
            program: self.executable.clone(),
            args: self.args.clone(),
            cwd: cwd.to_path_buf(),
        }));

        self.lifecycle = Lifecycle::Running;
        self.emit(&mut step, ProcessEvent::Status(ProcessStatus::running()));

        step
    }

    /// A chunk of output arrived from the OS process.
    pub fn handle_output(&mut self, stream: OutputStream, chunk: String) -> ProcessStep {
        let mut step = ProcessStep::default();

        if self.lifecycle == Lifecycle::Disposed {
            return step;
        }

        if let Some(line) = classify::last_log_line(&chunk) {
            self.last_log_line = Some(line.to_string());
        }

        let event = match stream {
            OutputStream::Stdout => ProcessEvent::Stdout(chunk),
            OutputStream::Stderr => ProcessEvent::Stderr(chunk),
        };
        self.emit(&mut step, event);

        step
    }

    /// The OS reported an error for the process (spawn failure, IO error).
    pub fn handle_spawn_error(&mut self, message: &str) -> ProcessStep {
        let mut step = ProcessStep::default();

        if self.lifecycle != Lifecycle::Running {
            return step;
        }

        let note = format!(">>> Process '{}' errored: {}\n", self.category, message);
        self.emit(&mut step, ProcessEvent::Stderr(note));
        self.finish(&mut step, classify_spawn_error(message));

        step
    }

    /// The OS process closed; both pipes are already drained.
    pub fn handle_exit(&mut self, code: Option<i32>) -> ProcessStep {
        let mut step = ProcessStep::default();

        if self.lifecycle != Lifecycle::Running {
            debug!(
                process_id = %self.id,
                exit_code = ?code,
                "exit of a process that is no longer running; ignoring"
            );
            return step;
        }

        let note = format!(
            ">>> Process '{}' exited with code {}\n",
            self.category,
            code.unwrap_or(0)
        );
        self.emit(&mut step, ProcessEvent::Stderr(note));

        let status = classify_exit(code, self.last_log_line.as_deref());
        info!(
            process_id = %self.id,
            category = %self.category,
            exit_code = ?code,
            status = %status,
            "process exited"
        );
        self.finish(&mut step, status);

        step
    }

    /// Interrupt the running process. No-op if it is not running.
    pub fn kill_process(&mut self) -> ProcessStep {
        let mut step = ProcessStep::default();

        if self.lifecycle != Lifecycle::Running {
            return step;
        }

        info!(process_id = %self.id, category = %self.category, "killing process");

        step.actions.push(ProcessAction::Interrupt(self.id));
        self.emit(&mut step, ProcessEvent::Stderr(">>> Process killed\n".to_string()));
        self.finish(&mut step, ProcessStatus::killed());

        step
    }

    /// Kill if running, emit `Removed` and close every observer channel.
    ///
    /// Idempotent.
    pub fn dispose(&mut self) -> ProcessStep {
        let mut step = ProcessStep::default();

        if self.lifecycle == Lifecycle::Disposed {
            return step;
        }

        if self.lifecycle == Lifecycle::Running {
            let kill = self.kill_process();
            step.events.extend(kill.events);
            step.actions.extend(kill.actions);
        }

        self.emit(&mut step, ProcessEvent::Status(ProcessStatus::removed()));
        self.lifecycle = Lifecycle::Disposed;
        self.observers.clear();

        step
    }

    fn finish(&mut self, step: &mut ProcessStep, status: ProcessStatus) {
        self.lifecycle = Lifecycle::Terminal(status.kind);
        self.emit(step, ProcessEvent::Status(status));
    }

    fn emit(&mut self, step: &mut ProcessStep, event: ProcessEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
        step.events.push(event);
    }
}

/// Shell-quoted join of executable and arguments.
///
/// Deterministic for identical inputs and splittable back into the same
/// argument vector.
pub fn command_signature(executable: &str, args: &[String]) -> String {
    shell_words::join(std::iter::once(executable).chain(args.iter().map(String::as_str)))
}

/// Expand a leading `~` path component to the user's home directory.
pub fn expand_user(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return path.to_string(),
    };

    match home_dir() {
        Some(home) => format!("{}{}", home.display(), rest),
        None => path.to_string(),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
