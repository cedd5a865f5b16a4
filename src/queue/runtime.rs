// src/queue/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::ProcessBackend;
use crate::process::{ManagedProcess, ProcessKey};
use crate::types::{EnqueueMode, ProcessCategory};

use super::core::{ExecutionQueue, QueueCommand, QueueSnapshot};
use super::{BackendEvent, StatusBroadcaster};

/// Request sent to the queue actor by a [`super::QueueHandle`].
#[derive(Debug)]
pub enum QueueRequest {
    Enqueue {
        process: ManagedProcess,
        mode: EnqueueMode,
    },
    Remove {
        key: ProcessKey,
        silent: bool,
    },
    Clear(Option<ProcessCategory>),
    ForceRun(ManagedProcess),
    ForceRunQueued(ProcessKey),
    Kill,
    /// Kill the active process if it is in one of these categories.
    KillIn(Vec<ProcessCategory>),
    SetWorkspaceRoot(Option<PathBuf>),
    Snapshot(oneshot::Sender<QueueSnapshot>),
    /// Dispose everything and stop the actor.
    Shutdown,
}

/// Owns the [`ExecutionQueue`] and drives it from requests and backend
/// events, delegating OS work to a [`ProcessBackend`].
///
/// This is a pure IO shell around `ExecutionQueue`, which contains all the
/// queue semantics.
pub struct QueueRuntime<B: ProcessBackend> {
    core: ExecutionQueue,
    request_rx: mpsc::Receiver<QueueRequest>,
    backend_rx: mpsc::UnboundedReceiver<BackendEvent>,
    backend: B,
    broadcaster: StatusBroadcaster,
}

impl<B: ProcessBackend> fmt::Debug for QueueRuntime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: ProcessBackend> QueueRuntime<B> {
    pub fn new(
        core: ExecutionQueue,
        request_rx: mpsc::Receiver<QueueRequest>,
        backend_rx: mpsc::UnboundedReceiver<BackendEvent>,
        backend: B,
        broadcaster: StatusBroadcaster,
    ) -> Self {
        Self {
            core,
            request_rx,
            backend_rx,
            backend,
            broadcaster,
        }
    }

    /// Main event loop.
    ///
    /// Runs until a `Shutdown` request arrives or every handle is dropped.
    /// In both cases the queue is disposed before returning.
    pub async fn run(mut self) -> Result<()> {
        info!("execution queue started");

        loop {
            tokio::select! {
                request = self.request_rx.recv() => {
                    let Some(request) = request else {
                        info!("all queue handles dropped; shutting down");
                        break;
                    };

                    if matches!(request, QueueRequest::Shutdown) {
                        info!("queue shutdown requested");
                        break;
                    }

                    let commands = self.handle_request(request);
                    self.execute(commands).await;
                }

                Some(event) = self.backend_rx.recv() => {
                    debug!(process_id = %event.id(), "queue received backend event");
                    let commands = self.core.handle_backend_event(event);
                    self.execute(commands).await;
                }
            }
        }

        let commands = self.core.shutdown();
        self.execute(commands).await;

        info!("execution queue exiting");
        Ok(())
    }

    fn handle_request(&mut self, request: QueueRequest) -> Vec<QueueCommand> {
        match request {
            QueueRequest::Enqueue { process, mode } => self.core.add_to_queue(process, mode),
            QueueRequest::Remove { key, silent } => self.core.remove_from_queue(&key, silent),
            QueueRequest::Clear(category) => self.core.clear_queue(category),
            QueueRequest::ForceRun(process) => self.core.force_run_process(process),
            QueueRequest::ForceRunQueued(key) => self.core.force_run_queued(&key),
            QueueRequest::Kill => self.core.kill_process(),
            QueueRequest::KillIn(categories) => self.core.kill_process_in(&categories),
            QueueRequest::SetWorkspaceRoot(root) => self.core.set_workspace_root(root),
            QueueRequest::Snapshot(reply) => {
                if reply.send(self.core.snapshot()).is_err() {
                    debug!("snapshot requester went away");
                }
                Vec::new()
            }
            QueueRequest::Shutdown => self.core.shutdown(),
        }
    }

    /// Execute commands from the core, in order.
    ///
    /// Backend failures never stop the actor. A refused spawn is fed back to
    /// the core as `SpawnFailed`, so the process ends `Errored` and the next
    /// entry is dispatched; a failed interrupt is only logged.
    async fn execute(&mut self, commands: Vec<QueueCommand>) {
        let mut pending = VecDeque::from(commands);

        while let Some(command) = pending.pop_front() {
            match command {
                QueueCommand::Spawn(request) => {
                    let id = request.id;
                    debug!(
                        process_id = %id,
                        program = %request.program,
                        cwd = %request.cwd.display(),
                        "spawning process"
                    );
                    if let Err(err) = self.backend.spawn(request).await {
                        warn!(process_id = %id, error = %err, "backend refused to spawn process");
                        let follow_up = self.core.handle_backend_event(BackendEvent::SpawnFailed {
                            id,
                            message: err.to_string(),
                        });
                        for command in follow_up.into_iter().rev() {
                            pending.push_front(command);
                        }
                    }
                }
                QueueCommand::Interrupt(id) => {
                    debug!(process_id = %id, "interrupting process");
                    if let Err(err) = self.backend.interrupt(id).await {
                        warn!(process_id = %id, error = %err, "failed to interrupt process");
                    }
                }
                QueueCommand::Publish(event) => self.broadcaster.publish(event),
            }
        }
    }
}
