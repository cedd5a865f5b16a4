// src/queue/broadcast.rs

//! Fan-out of queue events to any number of subscribers.
//!
//! Three independent channels are kept so that a consumer interested only in
//! status changes is not lagged by a chatty analysis run.

use tokio::sync::broadcast;
use tracing::trace;

use super::{QueueEvent, StatusChange};

/// Default per-channel buffer size.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// Sending side of the queue's shared stdout, stderr and status streams.
///
/// Cheap to clone; every clone publishes to the same subscribers.
#[derive(Debug, Clone)]
pub struct StatusBroadcaster {
    stdout: broadcast::Sender<String>,
    stderr: broadcast::Sender<String>,
    status: broadcast::Sender<StatusChange>,
}

impl StatusBroadcaster {
    /// # Panics
    ///
    /// Panics if `capacity` is zero. The config layer rejects that value.
    pub fn new(capacity: usize) -> Self {
        let (stdout, _) = broadcast::channel(capacity);
        let (stderr, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self {
            stdout,
            stderr,
            status,
        }
    }

    pub fn subscribe_stdout(&self) -> broadcast::Receiver<String> {
        self.stdout.subscribe()
    }

    pub fn subscribe_stderr(&self) -> broadcast::Receiver<String> {
        self.stderr.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusChange> {
        self.status.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: QueueEvent) {
        let delivered = match event {
            QueueEvent::Stdout(chunk) => self.stdout.send(chunk).is_ok(),
            QueueEvent::Stderr(chunk) => self.stderr.send(chunk).is_ok(),
            QueueEvent::StatusChanged(change) => self.status.send(change).is_ok(),
        };

        if !delivered {
            trace!("no subscribers for queue event");
        }
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}
