// src/queue/mod.rs

//! Execution queue for tool invocations.
//!
//! This module ties together:
//! - the pure queue state machine ([`core`]), which decides what runs next
//! - the status broadcaster that fans events out to subscribers
//! - the async actor loop ([`runtime`]) that owns the queue and reacts to:
//!   - requests from [`QueueHandle`]s
//!   - output and exit events from the process backend
//!
//! Only the actor touches the queue, so every mutation is serialized.

use crate::process::{OutputStream, ProcessId, ProcessInfo, ProcessStatus};

/// Status transition of a process, as seen by queue-level subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: ProcessStatus,
    pub process: ProcessInfo,
}

/// Event published by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// Stdout of the active process, if that process forwards it.
    Stdout(String),
    /// Stderr and metadata lines of the active process.
    Stderr(String),
    StatusChanged(StatusChange),
}

/// Events flowing from the process backend into the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A chunk of output was read from one of the pipes.
    Output {
        id: ProcessId,
        stream: OutputStream,
        chunk: String,
    },
    /// The process could not be spawned or waited on.
    SpawnFailed { id: ProcessId, message: String },
    /// The process closed and both pipes are drained. `None` when it was
    /// terminated by a signal.
    Exited { id: ProcessId, code: Option<i32> },
}

impl BackendEvent {
    pub fn id(&self) -> ProcessId {
        match self {
            BackendEvent::Output { id, .. }
            | BackendEvent::SpawnFailed { id, .. }
            | BackendEvent::Exited { id, .. } => *id,
        }
    }
}

pub mod broadcast;
pub mod core;
pub mod handle;
pub mod runtime;

pub use broadcast::StatusBroadcaster;
pub use core::{DEFAULT_PRIORITY, ExecutionQueue, QueueCommand, QueueSnapshot};
pub use handle::{QueueHandle, QueueOptions, spawn_queue};
pub use runtime::{QueueRequest, QueueRuntime};
