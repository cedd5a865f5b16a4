// src/process/mod.rs

//! Single external-process invocations.
//!
//! - [`managed`] holds [`ManagedProcess`], the per-invocation lifecycle state
//!   machine (`NotRunning -> Running -> Finished | Warning | Errored | Killed`,
//!   followed by `Removed` once disposed).
//! - [`status`] defines the status values emitted along the way.
//! - [`classify`] turns exit codes and the tool's last log line into an
//!   outcome. It is a pure function so the log-format heuristics can change
//!   without touching lifecycle code.

pub mod classify;
pub mod managed;
pub mod status;

pub use classify::{classify_exit, split_log_line, Severity};
pub use managed::{
    command_signature, ManagedProcess, OutputStream, ProcessAction, ProcessEvent, ProcessId,
    ProcessInfo, ProcessKey, ProcessOptions, ProcessStep, SpawnRequest,
};
pub use status::{ProcessStatus, StatusKind};
