// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The queue actor talks to a `ProcessBackend` instead of spawning OS
//! processes itself. This makes it easy to swap in a scripted backend in
//! tests while keeping the production implementation here.
//!
//! - `RealProcessBackend` spawns the tool with `tokio::process` and reports
//!   output chunks and exits as [`BackendEvent`]s.
//! - Tests can provide their own `ProcessBackend` that, for example, records
//!   spawn requests and emits canned output and exit codes.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::Result;
use crate::process::{ProcessId, SpawnRequest};
use crate::queue::BackendEvent;

use super::runner::run_process;

/// Trait abstracting how processes are started and interrupted.
///
/// Implementations must not wait for the process to finish: `spawn` returns
/// once the process is on its way, and completion is reported through the
/// backend event channel.
pub trait ProcessBackend: Send {
    fn spawn(
        &mut self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Request that a running process stop. Unknown ids are ignored.
    fn interrupt(
        &mut self,
        id: ProcessId,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Internal handle for a spawned process.
///
/// - `interrupt` asks the runner to send an interrupt signal.
/// - `handle` is the Tokio task that owns the child.
struct ActiveProcess {
    interrupt: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Backend used in production.
pub struct RealProcessBackend {
    events: mpsc::UnboundedSender<BackendEvent>,
    active: HashMap<ProcessId, ActiveProcess>,
}

impl RealProcessBackend {
    pub fn new(events: mpsc::UnboundedSender<BackendEvent>) -> Self {
        Self {
            events,
            active: HashMap::new(),
        }
    }

    fn prune_finished(&mut self) {
        self.active.retain(|_, p| !p.handle.is_finished());
    }
}

impl ProcessBackend for RealProcessBackend {
    fn spawn(
        &mut self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.prune_finished();

            let id = request.id;
            let (interrupt_tx, interrupt_rx) = oneshot::channel();
            let events = self.events.clone();

            let handle = tokio::spawn(async move {
                run_process(request, events, interrupt_rx).await;
                debug!(process_id = %id, "process runner finished");
            });

            self.active.insert(
                id,
                ActiveProcess {
                    interrupt: interrupt_tx,
                    handle,
                },
            );
            Ok(())
        })
    }

    fn interrupt(
        &mut self,
        id: ProcessId,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            match self.active.remove(&id) {
                Some(process) => {
                    if process.interrupt.send(()).is_err() {
                        debug!(process_id = %id, "process already finished while interrupting");
                    }
                }
                None => debug!(process_id = %id, "interrupt for unknown process; ignoring"),
            }
            Ok(())
        })
    }
}
