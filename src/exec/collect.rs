// src/exec/collect.rs

//! Follow a single process to its end, optionally buffering its stdout.

use tokio::sync::mpsc;

use crate::process::{ProcessEvent, ProcessStatus, StatusKind};

/// Everything a process printed on stdout, plus how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedOutput {
    /// First terminal status observed. `None` if the channel closed before
    /// the process reported one.
    pub status: Option<ProcessStatus>,
    pub stdout: String,
}

impl CollectedOutput {
    /// The run completed cleanly (not a warning, error, kill or removal).
    pub fn finished(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.kind == StatusKind::Finished)
    }
}

/// Read events from a process subscription until it reaches a terminal
/// status, then return the buffered stdout.
///
/// A process that is removed from the queue before it ran yields
/// `Removed`; one that was dropped silently yields `None`.
pub async fn collect_output(mut events: mpsc::UnboundedReceiver<ProcessEvent>) -> CollectedOutput {
    let mut stdout = String::new();

    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::Stdout(chunk) => stdout.push_str(&chunk),
            ProcessEvent::Stderr(_) => {}
            ProcessEvent::Status(status) => {
                if ends_process(&status) {
                    return CollectedOutput {
                        status: Some(status),
                        stdout,
                    };
                }
            }
        }
    }

    CollectedOutput {
        status: None,
        stdout,
    }
}

/// Wait until a process subscription reports how the process ended,
/// discarding its output. `None` if it was dropped silently.
pub async fn wait_for_end(mut events: mpsc::UnboundedReceiver<ProcessEvent>) -> Option<ProcessStatus> {
    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::Status(status) if ends_process(&status) => return Some(status),
            _ => {}
        }
    }
    None
}

fn ends_process(status: &ProcessStatus) -> bool {
    status.kind.is_terminal() && status.kind != StatusKind::NotRunning
}
