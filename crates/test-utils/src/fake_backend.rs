use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use checkrunner::errors::{CheckrunnerError, Result};
use checkrunner::exec::ProcessBackend;
use checkrunner::process::{OutputStream, ProcessId, SpawnRequest};
use checkrunner::queue::BackendEvent;
use checkrunner::types::ProcessCategory;

/// Canned behaviour of one fake process.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: Option<i32>,
    /// Keep the process "running" until the test finishes or interrupts it.
    pub hold: bool,
    /// Report a spawn failure with this message instead of running.
    pub spawn_error: Option<String>,
    /// Fail the backend call itself with this message.
    pub refuse: Option<String>,
}

impl Script {
    /// Exit 0 without output.
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    /// Stay running until `FakeControl::finish` or an interrupt.
    pub fn hold() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }

    pub fn spawn_error(message: &str) -> Self {
        Self {
            spawn_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Make `ProcessBackend::spawn` return an error.
    pub fn refuse(message: &str) -> Self {
        Self {
            refuse: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_stdout(mut self, chunk: &str) -> Self {
        self.stdout.push(chunk.to_string());
        self
    }

    pub fn with_stderr(mut self, chunk: &str) -> Self {
        self.stderr.push(chunk.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    scripts: HashMap<ProcessCategory, VecDeque<Script>>,
    spawned: Vec<SpawnRequest>,
    interrupted: Vec<ProcessId>,
    held: HashSet<ProcessId>,
    refuse_interrupts: bool,
    events: Option<mpsc::UnboundedSender<BackendEvent>>,
}

impl FakeState {
    fn send(&self, event: BackendEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Next script for a category. The last one queued is reused once the
    /// others are consumed; categories without scripts exit 0.
    fn next_script(&mut self, category: ProcessCategory) -> Script {
        match self.scripts.get_mut(&category) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_else(Script::success),
            None => Script::success(),
        }
    }
}

/// Test-side control of a [`FakeBackend`]: scripts outcomes per category and
/// records what the queue asked for.
#[derive(Debug, Clone, Default)]
pub struct FakeControl {
    state: Arc<Mutex<FakeState>>,
}

impl FakeControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Append a script for processes of `category`, used in order.
    pub fn script(&self, category: ProcessCategory, script: Script) -> &Self {
        self.lock().scripts.entry(category).or_default().push_back(script);
        self
    }

    /// Build the backend, wired to the queue's event channel. Pass this as
    /// the factory to `spawn_queue`.
    pub fn backend(&self, events: mpsc::UnboundedSender<BackendEvent>) -> FakeBackend {
        self.lock().events = Some(events);
        FakeBackend {
            state: Arc::clone(&self.state),
        }
    }

    /// Make every later `ProcessBackend::interrupt` call return an error.
    pub fn refuse_interrupts(&self) -> &Self {
        self.lock().refuse_interrupts = true;
        self
    }

    pub fn spawned(&self) -> Vec<SpawnRequest> {
        self.lock().spawned.clone()
    }

    pub fn spawned_categories(&self) -> Vec<ProcessCategory> {
        self.lock().spawned.iter().map(|r| r.category).collect()
    }

    pub fn interrupted(&self) -> Vec<ProcessId> {
        self.lock().interrupted.clone()
    }

    /// Complete a held process with the given exit code.
    pub fn finish(&self, id: ProcessId, code: Option<i32>) {
        let mut state = self.lock();
        if state.held.remove(&id) {
            state.send(BackendEvent::Exited { id, code });
        }
    }

    /// Poll until at least `n` processes were spawned.
    pub async fn wait_for_spawns(&self, n: usize) -> Vec<SpawnRequest> {
        loop {
            let spawned = self.spawned();
            if spawned.len() >= n {
                return spawned;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// A fake backend that:
/// - records every spawn and interrupt request
/// - replays the scripted output and exit code for the process category.
#[derive(Debug)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl ProcessBackend for FakeBackend {
    fn spawn(
        &mut self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let mut state = state.lock().unwrap();
            let id = request.id;
            let script = state.next_script(request.category);
            state.spawned.push(request);

            if let Some(message) = script.refuse {
                return Err(CheckrunnerError::Other(anyhow::anyhow!(message)));
            }
            if let Some(message) = script.spawn_error {
                state.send(BackendEvent::SpawnFailed { id, message });
                return Ok(());
            }

            for chunk in script.stdout {
                state.send(BackendEvent::Output {
                    id,
                    stream: OutputStream::Stdout,
                    chunk,
                });
            }
            for chunk in script.stderr {
                state.send(BackendEvent::Output {
                    id,
                    stream: OutputStream::Stderr,
                    chunk,
                });
            }

            if script.hold {
                state.held.insert(id);
            } else {
                state.send(BackendEvent::Exited {
                    id,
                    code: script.exit_code,
                });
            }
            Ok(())
        })
    }

    fn interrupt(
        &mut self,
        id: ProcessId,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let mut state = state.lock().unwrap();
            state.interrupted.push(id);
            if state.refuse_interrupts {
                return Err(CheckrunnerError::Other(anyhow::anyhow!("interrupt refused")));
            }
            if state.held.remove(&id) {
                state.send(BackendEvent::Exited { id, code: None });
            }
            Ok(())
        })
    }
}
