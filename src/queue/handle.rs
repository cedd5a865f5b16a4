// src/queue/handle.rs

//! Cloneable front door to the queue actor.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::errors::{CheckrunnerError, Result};
use crate::exec::ProcessBackend;
use crate::process::{ManagedProcess, ProcessKey};
use crate::types::{EnqueueMode, ProcessCategory};

use super::broadcast::DEFAULT_BROADCAST_CAPACITY;
use super::core::{DEFAULT_PRIORITY, ExecutionQueue, QueueSnapshot};
use super::runtime::{QueueRequest, QueueRuntime};
use super::{BackendEvent, StatusBroadcaster, StatusChange};

const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Construction parameters for the queue actor.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub workspace_root: Option<PathBuf>,
    pub broadcast_capacity: usize,
    pub priority: Vec<ProcessCategory>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            workspace_root: None,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            priority: DEFAULT_PRIORITY.to_vec(),
        }
    }
}

/// Spawn the queue actor on the current Tokio runtime.
///
/// `make_backend` receives the sender the backend reports OS events on.
/// The returned join handle resolves once the actor has disposed the queue.
pub fn spawn_queue<B, F>(options: QueueOptions, make_backend: F) -> (QueueHandle, JoinHandle<Result<()>>)
where
    B: ProcessBackend + 'static,
    F: FnOnce(mpsc::UnboundedSender<BackendEvent>) -> B,
{
    let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    let (backend_tx, backend_rx) = mpsc::unbounded_channel();

    let broadcaster = StatusBroadcaster::new(options.broadcast_capacity);
    let core = ExecutionQueue::with_priority(options.workspace_root, options.priority);
    let backend = make_backend(backend_tx);

    let runtime = QueueRuntime::new(core, request_rx, backend_rx, backend, broadcaster.clone());
    let join = tokio::spawn(runtime.run());

    (
        QueueHandle {
            tx: request_tx,
            broadcaster,
        },
        join,
    )
}

/// Handle for submitting work to the queue and observing it.
///
/// Every method fails with [`CheckrunnerError::QueueClosed`] once the actor
/// has stopped.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<QueueRequest>,
    broadcaster: StatusBroadcaster,
}

impl QueueHandle {
    async fn send(&self, request: QueueRequest) -> Result<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| CheckrunnerError::QueueClosed)
    }

    /// Submit a process. Subscribe to it beforehand to follow its own events.
    pub async fn add_to_queue(&self, process: ManagedProcess, mode: EnqueueMode) -> Result<()> {
        self.send(QueueRequest::Enqueue { process, mode }).await
    }

    pub async fn remove_from_queue(&self, key: ProcessKey, silent: bool) -> Result<()> {
        self.send(QueueRequest::Remove { key, silent }).await
    }

    /// Clear one category queue, or all of them with `None`.
    pub async fn clear_queue(&self, category: Option<ProcessCategory>) -> Result<()> {
        self.send(QueueRequest::Clear(category)).await
    }

    pub async fn force_run_process(&self, process: ManagedProcess) -> Result<()> {
        self.send(QueueRequest::ForceRun(process)).await
    }

    pub async fn force_run_queued(&self, key: ProcessKey) -> Result<()> {
        self.send(QueueRequest::ForceRunQueued(key)).await
    }

    /// Interrupt the active process.
    pub async fn kill_process(&self) -> Result<()> {
        self.send(QueueRequest::Kill).await
    }

    /// Interrupt the active process if it belongs to one of `categories`.
    pub async fn kill_process_in(&self, categories: Vec<ProcessCategory>) -> Result<()> {
        self.send(QueueRequest::KillIn(categories)).await
    }

    pub async fn set_workspace_root(&self, root: Option<PathBuf>) -> Result<()> {
        self.send(QueueRequest::SetWorkspaceRoot(root)).await
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(QueueRequest::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| CheckrunnerError::QueueClosed)
    }

    /// Ask the actor to dispose the queue and stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(QueueRequest::Shutdown).await
    }

    pub fn subscribe_stdout(&self) -> broadcast::Receiver<String> {
        self.broadcaster.subscribe_stdout()
    }

    pub fn subscribe_stderr(&self) -> broadcast::Receiver<String> {
        self.broadcaster.subscribe_stderr()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusChange> {
        self.broadcaster.subscribe_status()
    }
}
