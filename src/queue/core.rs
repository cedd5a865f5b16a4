// src/queue/core.rs

//! Pure execution queue state machine.
//!
//! `ExecutionQueue` owns every queued [`ManagedProcess`] plus the single
//! active one. Each operation mutates that state and returns the
//! [`QueueCommand`]s the IO shell (`queue::runtime`) has to carry out:
//! spawning, interrupting, and publishing events to subscribers.
//!
//! Nothing here touches Tokio tasks, pipes or the OS, so every ordering and
//! dedup rule can be tested synchronously.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::process::{
    ManagedProcess, ProcessAction, ProcessEvent, ProcessInfo, ProcessKey, ProcessStatus,
    ProcessStep, SpawnRequest, StatusKind,
};
use crate::queue::{BackendEvent, QueueEvent, StatusChange};
use crate::types::{EnqueueMode, ProcessCategory};

/// Dispatch order across categories. Categories not listed here are only
/// considered once every listed queue is empty.
pub const DEFAULT_PRIORITY: [ProcessCategory; 5] = [
    ProcessCategory::Version,
    ProcessCategory::Checkers,
    ProcessCategory::Parse,
    ProcessCategory::Log,
    ProcessCategory::Analyze,
];

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCommand {
    /// Spawn an OS process.
    Spawn(SpawnRequest),
    /// Send an interrupt signal to an OS process.
    Interrupt(crate::process::ProcessId),
    /// Deliver an event to queue-level subscribers.
    Publish(QueueEvent),
}

/// Point-in-time view of the queue contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub active: Option<ProcessInfo>,
    /// Non-empty category queues, in dispatch order.
    pub queued: Vec<(ProcessCategory, Vec<ProcessInfo>)>,
}

impl QueueSnapshot {
    pub fn queued_in(&self, category: ProcessCategory) -> &[ProcessInfo] {
        self.queued
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_queued(&self) -> usize {
        self.queued.iter().map(|(_, entries)| entries.len()).sum()
    }
}

/// Multi-category, deduplicating, priority-ordered queue that runs at most
/// one process at a time.
///
/// Invariants:
/// - at most one process is active (and therefore running);
/// - no two entries of one category queue share a command signature;
/// - the active command is never also queued, except for version checks,
///   which are not killed on resubmission.
#[derive(Debug)]
pub struct ExecutionQueue {
    queues: HashMap<ProcessCategory, VecDeque<ManagedProcess>>,
    priority: Vec<ProcessCategory>,
    active: Option<ManagedProcess>,
    /// Process promoted by `force_run_*`, started as soon as the slot frees.
    forced: Option<ManagedProcess>,
    workspace_root: Option<PathBuf>,
}

impl ExecutionQueue {
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        Self::with_priority(workspace_root, DEFAULT_PRIORITY.to_vec())
    }

    pub fn with_priority(workspace_root: Option<PathBuf>, priority: Vec<ProcessCategory>) -> Self {
        Self {
            queues: HashMap::new(),
            priority,
            active: None,
            forced: None,
            workspace_root,
        }
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn active(&self) -> Option<&ManagedProcess> {
        self.active.as_ref()
    }

    /// Entries of one category queue, front first.
    pub fn queued(&self, category: ProcessCategory) -> impl Iterator<Item = &ManagedProcess> {
        self.queues.get(&category).into_iter().flatten()
    }

    pub fn queued_len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// No active process and nothing waiting.
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.forced.is_none() && self.queued_len() == 0
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let mut queued: Vec<(ProcessCategory, Vec<ProcessInfo>)> = self
            .dispatch_order()
            .into_iter()
            .filter_map(|category| {
                let entries: Vec<ProcessInfo> =
                    self.queued(category).map(ManagedProcess::info).collect();
                (!entries.is_empty()).then_some((category, entries))
            })
            .collect();

        if let Some(forced) = &self.forced {
            queued.insert(0, (forced.category(), vec![forced.info()]));
        }

        QueueSnapshot {
            active: self.active.as_ref().map(ManagedProcess::info),
            queued,
        }
    }

    /// Submit a process to its category queue.
    pub fn add_to_queue(&mut self, mut process: ManagedProcess, mode: EnqueueMode) -> Vec<QueueCommand> {
        let mut out = Vec::new();
        let category = process.category();

        // Re-submitting the running command means its inputs changed; kill
        // the stale run. Version checks read no persistent data and are
        // left alone.
        let resubmits_active = self.active.as_ref().is_some_and(|active| {
            active.command_line() == process.command_line()
                && active.category() != ProcessCategory::Version
        });
        if resubmits_active {
            info!(
                category = %category,
                cmd = %process.command_line(),
                "resubmitted active command; killing the running instance"
            );
            self.kill_active(&mut out);
        }

        let is_duplicate = self.queued(category).any(|queued| *queued == process);
        if is_duplicate {
            match mode {
                EnqueueMode::Prepend => {
                    self.remove_matching(&process.key(), false, &mut out);
                }
                EnqueueMode::Append | EnqueueMode::Replace => {
                    debug!(
                        category = %category,
                        cmd = %process.command_line(),
                        "identical command already queued; discarding new submission"
                    );
                    process.dispose();
                    self.start_next_into(&mut out);
                    return out;
                }
            }
        }

        let info = process.info();
        match mode {
            EnqueueMode::Replace => {
                let displaced = self.queues.remove(&category).unwrap_or_default();
                for entry in displaced {
                    Self::discard(entry, &mut out);
                }
                self.queues.insert(category, VecDeque::from([process]));
            }
            EnqueueMode::Prepend => {
                self.queues.entry(category).or_default().push_front(process);
            }
            EnqueueMode::Append => {
                self.queues.entry(category).or_default().push_back(process);
            }
        }

        debug!(
            process_id = %info.id,
            category = %category,
            mode = ?mode,
            "process queued"
        );
        publish_status(&mut out, ProcessStatus::queued(), &info);

        self.start_next_into(&mut out);
        out
    }

    /// Remove every queued entry matching `key`.
    ///
    /// Unless `silent`, each entry is disposed and a `Removed` status is
    /// published for it. Silently removed entries are dropped, which closes
    /// their observer channels.
    pub fn remove_from_queue(&mut self, key: &ProcessKey, silent: bool) -> Vec<QueueCommand> {
        let mut out = Vec::new();
        self.remove_matching(key, silent, &mut out);
        out
    }

    /// Dispose every queued entry of `category`, or of every category.
    ///
    /// The active process is not affected.
    pub fn clear_queue(&mut self, category: Option<ProcessCategory>) -> Vec<QueueCommand> {
        let mut out = Vec::new();

        let categories: Vec<ProcessCategory> = match category {
            Some(c) => vec![c],
            None => self.dispatch_order(),
        };

        for category in categories {
            let entries = self.queues.remove(&category).unwrap_or_default();
            if !entries.is_empty() {
                debug!(category = %category, count = entries.len(), "clearing queue");
            }
            for entry in entries {
                Self::discard(entry, &mut out);
            }
        }

        out
    }

    /// Start the next process if the active slot is free.
    pub fn start_next_process(&mut self) -> Vec<QueueCommand> {
        let mut out = Vec::new();
        self.start_next_into(&mut out);
        out
    }

    /// Run `process` next, bypassing priority.
    ///
    /// A currently active process is killed first; `process` starts once the
    /// kill has freed the slot.
    pub fn force_run_process(&mut self, process: ManagedProcess) -> Vec<QueueCommand> {
        let mut out = Vec::new();

        // Drop queued copies so the same work does not run twice.
        self.remove_matching(&process.key(), true, &mut out);

        if let Some(previous) = self.forced.replace(process) {
            debug!(
                process_id = %previous.id(),
                "superseding a pending forced process"
            );
            Self::discard(previous, &mut out);
        }

        match self.active.as_ref().map(ManagedProcess::is_running) {
            Some(true) => self.kill_active(&mut out),
            Some(false) => self.retire_active(&mut out),
            None => self.start_next_into(&mut out),
        }

        out
    }

    /// Force-run the queued entry matching `key`. No-op if nothing matches.
    pub fn force_run_queued(&mut self, key: &ProcessKey) -> Vec<QueueCommand> {
        let Some(queue) = self.queues.get_mut(&key.category) else {
            return Vec::new();
        };
        let Some(index) = queue.iter().position(|p| p.command_line() == key.command_line) else {
            debug!(cmd = %key.command_line, "force-run requested for an unknown entry; ignoring");
            return Vec::new();
        };

        match queue.remove(index) {
            Some(process) => self.force_run_process(process),
            None => Vec::new(),
        }
    }

    /// Interrupt the active process, if any.
    pub fn kill_process(&mut self) -> Vec<QueueCommand> {
        let mut out = Vec::new();
        self.kill_active(&mut out);
        out
    }

    /// Interrupt the active process only if it belongs to one of
    /// `categories`.
    pub fn kill_process_in(&mut self, categories: &[ProcessCategory]) -> Vec<QueueCommand> {
        let matches = self
            .active
            .as_ref()
            .is_some_and(|active| categories.contains(&active.category()));

        if matches {
            self.kill_process()
        } else {
            Vec::new()
        }
    }

    /// Change the working directory used for new processes.
    ///
    /// An active process that could not start for lack of a workspace is
    /// started now.
    pub fn set_workspace_root(&mut self, root: Option<PathBuf>) -> Vec<QueueCommand> {
        let mut out = Vec::new();
        self.workspace_root = root;

        let parked = self
            .active
            .as_ref()
            .is_some_and(|active| active.status_kind() == StatusKind::NotRunning);

        if parked {
            let cwd = self.workspace_root.clone();
            if let Some(active) = self.active.as_mut() {
                let step = active.start(cwd.as_deref());
                self.relay_active(step, &mut out);
            }
        } else {
            self.start_next_into(&mut out);
        }

        out
    }

    /// Route an OS-level event to the active process.
    ///
    /// Events of processes that are no longer active (e.g. output arriving
    /// after a kill) are dropped.
    pub fn handle_backend_event(&mut self, event: BackendEvent) -> Vec<QueueCommand> {
        let mut out = Vec::new();

        let Some(active) = self.active.as_mut().filter(|a| a.id() == event.id()) else {
            debug!(process_id = %event.id(), "event for a process that is not active; ignoring");
            return out;
        };

        let step = match event {
            BackendEvent::Output { stream, chunk, .. } => active.handle_output(stream, chunk),
            BackendEvent::SpawnFailed { message, .. } => active.handle_spawn_error(&message),
            BackendEvent::Exited { code, .. } => active.handle_exit(code),
        };
        self.relay_active(step, &mut out);

        out
    }

    /// Dispose everything: queued entries, a pending forced process, and the
    /// active process (killing it if running). Nothing is dispatched after.
    pub fn shutdown(&mut self) -> Vec<QueueCommand> {
        let mut out = self.clear_queue(None);

        if let Some(forced) = self.forced.take() {
            Self::discard(forced, &mut out);
        }

        if let Some(mut active) = self.active.take() {
            let info = active.info();
            let step = active.dispose();
            relay_step(step, &info, active.forwards_stdout(), &mut out);
        }

        out
    }

    fn dispatch_order(&self) -> Vec<ProcessCategory> {
        let mut order = self.priority.clone();
        let mut rest: Vec<ProcessCategory> = self
            .queues
            .keys()
            .filter(|c| !self.priority.contains(c))
            .copied()
            .collect();
        rest.sort();
        order.extend(rest);
        order
    }

    /// Head of the first non-empty queue: priority list first, then any
    /// remaining category.
    fn pop_next(&mut self) -> Option<ManagedProcess> {
        let from_priority = self
            .priority
            .iter()
            .copied()
            .find(|c| self.queues.get(c).is_some_and(|q| !q.is_empty()));

        let category = from_priority.or_else(|| {
            self.queues
                .iter()
                .find(|(_, q)| !q.is_empty())
                .map(|(c, _)| *c)
        })?;

        self.queues.get_mut(&category)?.pop_front()
    }

    fn start_next_into(&mut self, out: &mut Vec<QueueCommand>) {
        if self.active.is_some() {
            return;
        }

        let Some(next) = self.forced.take().or_else(|| self.pop_next()) else {
            return;
        };

        debug!(
            process_id = %next.id(),
            category = %next.category(),
            "dispatching next process"
        );

        let cwd = self.workspace_root.clone();
        let active = self.active.insert(next);
        let step = active.start(cwd.as_deref());
        self.relay_active(step, out);
    }

    fn kill_active(&mut self, out: &mut Vec<QueueCommand>) {
        if let Some(active) = self.active.as_mut() {
            let step = active.kill_process();
            self.relay_active(step, out);
        }
    }

    /// Forward a lifecycle step of the active process, and free the slot
    /// when the step ended the run.
    fn relay_active(&mut self, step: ProcessStep, out: &mut Vec<QueueCommand>) {
        let Some(active) = self.active.as_ref() else {
            return;
        };

        let ended = step.statuses().any(|s| s.kind.ends_run());
        relay_step(step, &active.info(), active.forwards_stdout(), out);

        if ended {
            self.retire_active(out);
        }
    }

    /// Dispose the active process, clear the slot and dispatch the next one.
    fn retire_active(&mut self, out: &mut Vec<QueueCommand>) {
        if let Some(mut finished) = self.active.take() {
            let info = finished.info();
            debug!(process_id = %info.id, status = %finished.status_kind(), "retiring active process");
            let step = finished.dispose();
            relay_step(step, &info, finished.forwards_stdout(), out);
        }

        self.start_next_into(out);
    }

    fn remove_matching(&mut self, key: &ProcessKey, silent: bool, out: &mut Vec<QueueCommand>) {
        let Some(queue) = self.queues.get_mut(&key.category) else {
            return;
        };

        let (removed, kept): (VecDeque<ManagedProcess>, VecDeque<ManagedProcess>) = queue
            .drain(..)
            .partition(|p| p.command_line() == key.command_line);
        *queue = kept;

        if silent {
            return;
        }

        for entry in removed {
            Self::discard(entry, out);
        }
    }

    /// Publish `Removed` for a queued entry and dispose it.
    fn discard(mut entry: ManagedProcess, out: &mut Vec<QueueCommand>) {
        publish_status(out, ProcessStatus::removed(), &entry.info());
        entry.dispose();
    }
}

fn publish_status(out: &mut Vec<QueueCommand>, status: ProcessStatus, info: &ProcessInfo) {
    out.push(QueueCommand::Publish(QueueEvent::StatusChanged(StatusChange {
        status,
        process: info.clone(),
    })));
}

fn relay_step(step: ProcessStep, info: &ProcessInfo, forward_stdout: bool, out: &mut Vec<QueueCommand>) {
    for action in step.actions {
        out.push(match action {
            ProcessAction::Spawn(request) => QueueCommand::Spawn(request),
            ProcessAction::Interrupt(id) => QueueCommand::Interrupt(id),
        });
    }

    for event in step.events {
        match event {
            ProcessEvent::Stdout(chunk) => {
                if forward_stdout {
                    out.push(QueueCommand::Publish(QueueEvent::Stdout(chunk)));
                }
            }
            ProcessEvent::Stderr(chunk) => {
                out.push(QueueCommand::Publish(QueueEvent::Stderr(chunk)));
            }
            ProcessEvent::Status(status) => publish_status(out, status, info),
        }
    }
}
