// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the tool, using
//! `tokio::process::Command`, and reporting back to the queue via
//! [`BackendEvent`](crate::queue::BackendEvent)s.
//!
//! - [`backend`] provides the `ProcessBackend` trait and the concrete
//!   `RealProcessBackend` that the queue uses in production, and which
//!   tests can replace with a scripted implementation.
//! - [`runner`] handles a single OS process: pipes, exit, interrupt.
//! - [`collect`] follows one process to its end, buffering stdout for
//!   callers that parse it.

pub mod backend;
pub mod collect;
pub mod runner;

pub use backend::{ProcessBackend, RealProcessBackend};
pub use collect::{CollectedOutput, collect_output, wait_for_end};
