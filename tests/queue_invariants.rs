// tests/queue_invariants.rs

mod common;
use crate::common::builders::process;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use proptest::prelude::*;

use checkrunner::process::{ProcessId, StatusKind};
use checkrunner::queue::{BackendEvent, ExecutionQueue, QueueCommand, QueueEvent};
use checkrunner::types::{EnqueueMode, ProcessCategory};

#[derive(Debug, Clone)]
enum Op {
    Add {
        category: usize,
        target: usize,
        mode: usize,
    },
    Exit(i32),
    Kill,
    Clear(Option<usize>),
    ForceRun {
        category: usize,
        target: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..6usize, 0..3usize, 0..3usize)
            .prop_map(|(category, target, mode)| Op::Add { category, target, mode }),
        3 => prop_oneof![Just(0), Just(1), Just(2)].prop_map(Op::Exit),
        1 => Just(Op::Kill),
        1 => proptest::option::of(0..6usize).prop_map(Op::Clear),
        1 => (0..6usize, 0..3usize).prop_map(|(category, target)| Op::ForceRun { category, target }),
    ]
}

fn category(i: usize) -> ProcessCategory {
    ProcessCategory::ALL[i % ProcessCategory::ALL.len()]
}

fn mode(i: usize) -> EnqueueMode {
    [EnqueueMode::Append, EnqueueMode::Prepend, EnqueueMode::Replace][i % 3]
}

#[derive(Default)]
struct Observed {
    spawned: HashSet<ProcessId>,
    removed: HashMap<ProcessId, usize>,
}

impl Observed {
    fn record(&mut self, commands: &[QueueCommand]) -> Result<(), TestCaseError> {
        for command in commands {
            match command {
                QueueCommand::Spawn(request) => {
                    prop_assert!(self.spawned.insert(request.id), "{} spawned twice", request.id);
                }
                QueueCommand::Publish(QueueEvent::StatusChanged(change))
                    if change.status.kind == StatusKind::Removed =>
                {
                    *self.removed.entry(change.process.id).or_default() += 1;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn check_invariants(q: &ExecutionQueue) -> Result<(), TestCaseError> {
    if let Some(active) = q.active() {
        prop_assert!(active.is_running(), "active process is not running: {active:?}");
    }

    for c in ProcessCategory::ALL {
        let lines: Vec<&str> = q.queued(c).map(|p| p.command_line()).collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();
        prop_assert_eq!(lines.len(), unique.len(), "duplicate entries in {}", c);

        if let Some(active) = q.active().filter(|a| a.category() == c && c != ProcessCategory::Version) {
            prop_assert!(
                !lines.contains(&active.command_line()),
                "active command also queued: {}",
                active.command_line()
            );
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn queue_never_runs_more_than_one_process(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut q = ExecutionQueue::new(Some(PathBuf::from("/ws")));
        let mut observed = Observed::default();

        for op in ops {
            let commands = match op {
                Op::Add { category: c, target, mode: m } => {
                    let target = format!("file{target}.c");
                    q.add_to_queue(process(category(c), &["run", target.as_str()]), mode(m))
                }
                Op::Exit(code) => match q.active().map(|a| a.id()) {
                    Some(id) => q.handle_backend_event(BackendEvent::Exited { id, code: Some(code) }),
                    None => Vec::new(),
                },
                Op::Kill => q.kill_process(),
                Op::Clear(c) => q.clear_queue(c.map(category)),
                Op::ForceRun { category: c, target } => {
                    let target = format!("file{target}.c");
                    q.force_run_process(process(category(c), &["run", target.as_str()]))
                }
            };

            observed.record(&commands)?;
            check_invariants(&q)?;
        }

        let commands = q.shutdown();
        observed.record(&commands)?;

        prop_assert!(q.is_idle());
        for (id, count) in &observed.removed {
            prop_assert_eq!(*count, 1, "{} removed {} times", id, count);
        }
        for id in &observed.spawned {
            prop_assert!(observed.removed.contains_key(id), "{} ran but was never removed", id);
        }
    }
}
