// src/process/status.rs

//! Status values emitted by processes and the queue.

use std::fmt;

/// Kind of a process status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    NotRunning,
    Running,
    /// Added to the execution queue.
    Queued,
    Killed,
    Finished,
    Warning,
    Errored,
    /// Superseded in the queue, cleared, or disposed. Always the last event
    /// of a process instance.
    Removed,
}

impl StatusKind {
    /// Anything other than `Queued`/`Running`: the instance is done.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusKind::Queued | StatusKind::Running)
    }

    /// Terminal statuses that end an actual run and free the active slot.
    pub fn ends_run(&self) -> bool {
        matches!(
            self,
            StatusKind::Killed | StatusKind::Finished | StatusKind::Warning | StatusKind::Errored
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::NotRunning => "not-running",
            StatusKind::Running => "running",
            StatusKind::Queued => "queued",
            StatusKind::Killed => "killed",
            StatusKind::Finished => "finished",
            StatusKind::Warning => "warning",
            StatusKind::Errored => "errored",
            StatusKind::Removed => "removed",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status transition, with an optional free-text reason taken from the
/// tool's last log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    pub kind: StatusKind,
    pub reason: Option<String>,
}

impl ProcessStatus {
    pub fn new(kind: StatusKind) -> Self {
        Self { kind, reason: None }
    }

    pub fn with_reason(kind: StatusKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: Some(reason.into()),
        }
    }

    pub fn running() -> Self {
        Self::new(StatusKind::Running)
    }

    pub fn queued() -> Self {
        Self::new(StatusKind::Queued)
    }

    pub fn killed() -> Self {
        Self::new(StatusKind::Killed)
    }

    pub fn removed() -> Self {
        Self::new(StatusKind::Removed)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.kind, reason),
            None => write!(f, "{}", self.kind),
        }
    }
}
