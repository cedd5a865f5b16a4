// tests/queue_core.rs

mod common;
use crate::common::builders::process;

use std::path::PathBuf;

use checkrunner::process::{OutputStream, ProcessId, StatusKind};
use checkrunner::queue::{BackendEvent, ExecutionQueue, QueueCommand, QueueEvent};
use checkrunner::types::{EnqueueMode, ProcessCategory};

use ProcessCategory::{Analyze, Checkers, Log, Parse, Version};

fn queue() -> ExecutionQueue {
    ExecutionQueue::new(Some(PathBuf::from("/ws")))
}

fn spawned(commands: &[QueueCommand]) -> Vec<ProcessId> {
    commands
        .iter()
        .filter_map(|c| match c {
            QueueCommand::Spawn(request) => Some(request.id),
            _ => None,
        })
        .collect()
}

fn interrupted(commands: &[QueueCommand]) -> Vec<ProcessId> {
    commands
        .iter()
        .filter_map(|c| match c {
            QueueCommand::Interrupt(id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn statuses(commands: &[QueueCommand]) -> Vec<(ProcessId, StatusKind)> {
    commands
        .iter()
        .filter_map(|c| match c {
            QueueCommand::Publish(QueueEvent::StatusChanged(change)) => {
                Some((change.process.id, change.status.kind))
            }
            _ => None,
        })
        .collect()
}

fn active_id(q: &ExecutionQueue) -> Option<ProcessId> {
    q.active().map(|p| p.id())
}

fn queued_ids(q: &ExecutionQueue, category: ProcessCategory) -> Vec<ProcessId> {
    q.queued(category).map(|p| p.id()).collect()
}

fn exit(q: &mut ExecutionQueue, id: ProcessId, code: i32) -> Vec<QueueCommand> {
    q.handle_backend_event(BackendEvent::Exited { id, code: Some(code) })
}

#[test]
fn first_process_starts_immediately() {
    let mut q = queue();
    let p = process(Analyze, &["analyze", "a.c"]);
    let id = p.id();

    let out = q.add_to_queue(p, EnqueueMode::Append);

    assert_eq!(spawned(&out), vec![id]);
    assert_eq!(
        statuses(&out),
        vec![(id, StatusKind::Queued), (id, StatusKind::Running)]
    );
    assert_eq!(active_id(&q), Some(id));
    assert_eq!(q.queued_len(), 0);
}

#[test]
fn only_one_process_runs_at_a_time() {
    let mut q = queue();
    let a = process(Analyze, &["analyze", "a.c"]);
    let b = process(Analyze, &["analyze", "b.c"]);
    let (a_id, b_id) = (a.id(), b.id());

    q.add_to_queue(a, EnqueueMode::Append);
    let out = q.add_to_queue(b, EnqueueMode::Append);
    assert!(spawned(&out).is_empty());
    assert_eq!(queued_ids(&q, Analyze), vec![b_id]);

    let out = exit(&mut q, a_id, 0);
    assert_eq!(
        statuses(&out),
        vec![
            (a_id, StatusKind::Finished),
            (a_id, StatusKind::Removed),
            (b_id, StatusKind::Running),
        ]
    );
    assert_eq!(spawned(&out), vec![b_id]);
    assert_eq!(active_id(&q), Some(b_id));
}

#[test]
fn appending_a_queued_duplicate_keeps_the_first() {
    let mut q = queue();
    q.add_to_queue(process(Log, &["log"]), EnqueueMode::Append);

    let first = process(Analyze, &["analyze", "a.c"]);
    let first_id = first.id();
    q.add_to_queue(first, EnqueueMode::Append);

    let dup = process(Analyze, &["analyze", "a.c"]);
    let out = q.add_to_queue(dup, EnqueueMode::Append);

    assert!(statuses(&out).is_empty());
    assert_eq!(queued_ids(&q, Analyze), vec![first_id]);
}

#[test]
fn replacing_with_a_queued_duplicate_keeps_the_queue() {
    let mut q = queue();
    q.add_to_queue(process(Log, &["log"]), EnqueueMode::Append);

    let a = process(Analyze, &["analyze", "a.c"]);
    let b = process(Analyze, &["analyze", "b.c"]);
    let (a_id, b_id) = (a.id(), b.id());
    q.add_to_queue(a, EnqueueMode::Append);
    q.add_to_queue(b, EnqueueMode::Append);

    q.add_to_queue(process(Analyze, &["analyze", "a.c"]), EnqueueMode::Replace);
    assert_eq!(queued_ids(&q, Analyze), vec![a_id, b_id]);
}

#[test]
fn prepending_a_duplicate_promotes_it() {
    let mut q = queue();
    q.add_to_queue(process(Log, &["log"]), EnqueueMode::Append);

    let a = process(Analyze, &["analyze", "a.c"]);
    let b = process(Analyze, &["analyze", "b.c"]);
    let (a_id, b_id) = (a.id(), b.id());
    q.add_to_queue(a, EnqueueMode::Append);
    q.add_to_queue(b, EnqueueMode::Append);

    let again = process(Analyze, &["analyze", "b.c"]);
    let again_id = again.id();
    let out = q.add_to_queue(again, EnqueueMode::Prepend);

    assert_eq!(
        statuses(&out),
        vec![(b_id, StatusKind::Removed), (again_id, StatusKind::Queued)]
    );
    assert_eq!(queued_ids(&q, Analyze), vec![again_id, a_id]);
}

#[test]
fn replace_only_clears_its_own_category() {
    let mut q = queue();
    let log = process(Log, &["log"]);
    let log_id = log.id();
    q.add_to_queue(log, EnqueueMode::Append);

    let parse = process(Parse, &["parse"]);
    let parse_id = parse.id();
    q.add_to_queue(parse, EnqueueMode::Append);

    let a = process(Analyze, &["analyze", "a.c"]);
    let b = process(Analyze, &["analyze", "b.c"]);
    let (a_id, b_id) = (a.id(), b.id());
    q.add_to_queue(a, EnqueueMode::Append);
    q.add_to_queue(b, EnqueueMode::Append);

    let all = process(Analyze, &["analyze", "/ws"]);
    let all_id = all.id();
    let out = q.add_to_queue(all, EnqueueMode::Replace);

    assert_eq!(
        statuses(&out),
        vec![
            (a_id, StatusKind::Removed),
            (b_id, StatusKind::Removed),
            (all_id, StatusKind::Queued),
        ]
    );
    assert_eq!(queued_ids(&q, Analyze), vec![all_id]);
    assert_eq!(queued_ids(&q, Parse), vec![parse_id]);
    assert_eq!(active_id(&q), Some(log_id));
}

#[test]
fn dispatch_follows_category_priority() {
    let mut q = queue();
    let blocker = process(ProcessCategory::Other, &["other"]);
    let blocker_id = blocker.id();
    q.add_to_queue(blocker, EnqueueMode::Append);

    let analyze = process(Analyze, &["analyze"]);
    let log = process(Log, &["log"]);
    let parse = process(Parse, &["parse"]);
    let checkers = process(Checkers, &["checkers"]);
    let version = process(Version, &["analyzer-version"]);
    let expected = vec![version.id(), checkers.id(), parse.id(), log.id(), analyze.id()];

    for p in [analyze, log, parse, checkers, version] {
        q.add_to_queue(p, EnqueueMode::Append);
    }

    let mut order = Vec::new();
    let mut current = blocker_id;
    for _ in 0..expected.len() {
        let out = exit(&mut q, current, 0);
        let started = spawned(&out);
        assert_eq!(started.len(), 1);
        current = started[0];
        order.push(current);
    }
    assert_eq!(order, expected);

    exit(&mut q, current, 0);
    assert!(q.is_idle());
}

#[test]
fn resubmitting_the_active_command_kills_it() {
    let mut q = queue();
    let first = process(Analyze, &["analyze", "a.c"]);
    let first_id = first.id();
    q.add_to_queue(first, EnqueueMode::Append);

    let again = process(Analyze, &["analyze", "a.c"]);
    let again_id = again.id();
    let out = q.add_to_queue(again, EnqueueMode::Prepend);

    assert_eq!(interrupted(&out), vec![first_id]);
    assert_eq!(spawned(&out), vec![again_id]);
    assert_eq!(
        statuses(&out),
        vec![
            (first_id, StatusKind::Killed),
            (first_id, StatusKind::Removed),
            (again_id, StatusKind::Queued),
            (again_id, StatusKind::Running),
        ]
    );
    assert_eq!(active_id(&q), Some(again_id));
}

#[test]
fn resubmitting_an_active_version_check_does_not_kill_it() {
    let mut q = queue();
    let first = process(Version, &["analyzer-version"]);
    let first_id = first.id();
    q.add_to_queue(first, EnqueueMode::Replace);

    let again = process(Version, &["analyzer-version"]);
    let again_id = again.id();
    let out = q.add_to_queue(again, EnqueueMode::Replace);

    assert!(interrupted(&out).is_empty());
    assert_eq!(active_id(&q), Some(first_id));
    assert_eq!(queued_ids(&q, Version), vec![again_id]);
}

#[test]
fn output_of_a_killed_process_is_dropped() {
    let mut q = queue();
    let p = process(Analyze, &["analyze"]);
    let id = p.id();
    q.add_to_queue(p, EnqueueMode::Append);
    q.kill_process();

    let out = q.handle_backend_event(BackendEvent::Output {
        id,
        stream: OutputStream::Stdout,
        chunk: "late\n".to_string(),
    });
    assert!(out.is_empty());
    assert!(exit(&mut q, id, 0).is_empty());
    assert!(q.is_idle());
}

#[test]
fn stdout_is_only_published_for_forwarding_categories() {
    let mut q = queue();
    let parse = process(Parse, &["parse"]);
    let parse_id = parse.id();
    q.add_to_queue(parse, EnqueueMode::Append);

    let out = q.handle_backend_event(BackendEvent::Output {
        id: parse_id,
        stream: OutputStream::Stdout,
        chunk: "{}".to_string(),
    });
    assert!(out.is_empty());

    exit(&mut q, parse_id, 0);
    let log = process(Log, &["log"]);
    let log_id = log.id();
    q.add_to_queue(log, EnqueueMode::Append);

    let out = q.handle_backend_event(BackendEvent::Output {
        id: log_id,
        stream: OutputStream::Stdout,
        chunk: "building\n".to_string(),
    });
    assert_eq!(
        out,
        vec![QueueCommand::Publish(QueueEvent::Stdout("building\n".to_string()))]
    );
}

#[test]
fn force_run_kills_the_active_process_and_goes_next() {
    let mut q = queue();
    let running = process(Analyze, &["analyze", "a.c"]);
    let running_id = running.id();
    q.add_to_queue(running, EnqueueMode::Append);
    q.add_to_queue(process(Version, &["analyzer-version"]), EnqueueMode::Append);

    let forced = process(Log, &["log"]);
    let forced_id = forced.id();
    let out = q.force_run_process(forced);

    assert_eq!(interrupted(&out), vec![running_id]);
    assert_eq!(spawned(&out), vec![forced_id]);
    assert_eq!(active_id(&q), Some(forced_id));
    assert_eq!(q.queued(Version).count(), 1);
}

#[test]
fn force_run_on_an_idle_queue_starts_right_away() {
    let mut q = queue();
    let forced = process(Parse, &["parse"]);
    let forced_id = forced.id();

    let out = q.force_run_process(forced);
    assert_eq!(spawned(&out), vec![forced_id]);
    assert!(interrupted(&out).is_empty());
}

#[test]
fn force_run_queued_promotes_the_matching_entry() {
    let mut q = queue();
    q.add_to_queue(process(Log, &["log"]), EnqueueMode::Append);
    let a = process(Analyze, &["analyze", "a.c"]);
    let b = process(Analyze, &["analyze", "b.c"]);
    let b_id = b.id();
    let b_key = b.key();
    q.add_to_queue(a, EnqueueMode::Append);
    q.add_to_queue(b, EnqueueMode::Append);

    let out = q.force_run_queued(&b_key);

    assert_eq!(spawned(&out), vec![b_id]);
    assert_eq!(active_id(&q), Some(b_id));
    assert_eq!(q.queued(Analyze).count(), 1);

    let unknown = process(Analyze, &["analyze", "zzz.c"]).key();
    assert!(q.force_run_queued(&unknown).is_empty());
}

#[test]
fn processes_wait_for_a_workspace_root() {
    let mut q = ExecutionQueue::new(None);
    let p = process(Analyze, &["analyze"]);
    let id = p.id();

    let out = q.add_to_queue(p, EnqueueMode::Append);
    assert!(spawned(&out).is_empty());
    assert_eq!(active_id(&q), Some(id));

    let out = q.set_workspace_root(Some(PathBuf::from("/ws")));
    match out.iter().find_map(|c| match c {
        QueueCommand::Spawn(request) => Some(request),
        _ => None,
    }) {
        Some(request) => {
            assert_eq!(request.id, id);
            assert_eq!(request.cwd, PathBuf::from("/ws"));
        }
        None => panic!("expected the parked process to start, got {out:?}"),
    }
}

#[test]
fn remove_and_clear_publish_removed() {
    let mut q = queue();
    let log = process(Log, &["log"]);
    let log_id = log.id();
    q.add_to_queue(log, EnqueueMode::Append);

    let a = process(Analyze, &["analyze", "a.c"]);
    let a_id = a.id();
    let a_key = a.key();
    let b = process(Analyze, &["analyze", "b.c"]);
    let b_id = b.id();
    let parse = process(Parse, &["parse"]);
    let parse_id = parse.id();
    q.add_to_queue(a, EnqueueMode::Append);
    q.add_to_queue(b, EnqueueMode::Append);
    q.add_to_queue(parse, EnqueueMode::Append);

    let out = q.remove_from_queue(&a_key, false);
    assert_eq!(statuses(&out), vec![(a_id, StatusKind::Removed)]);

    let out = q.clear_queue(Some(Analyze));
    assert_eq!(statuses(&out), vec![(b_id, StatusKind::Removed)]);
    assert_eq!(q.queued(Parse).count(), 1);

    let out = q.clear_queue(None);
    assert_eq!(statuses(&out), vec![(parse_id, StatusKind::Removed)]);

    // The active process is untouched by clearing.
    assert_eq!(active_id(&q), Some(log_id));
}

#[test]
fn silent_removal_publishes_nothing() {
    let mut q = queue();
    q.add_to_queue(process(Log, &["log"]), EnqueueMode::Append);
    let a = process(Analyze, &["analyze", "a.c"]);
    let key = a.key();
    q.add_to_queue(a, EnqueueMode::Append);

    let out = q.remove_from_queue(&key, true);
    assert!(out.is_empty());
    assert_eq!(q.queued(Analyze).count(), 0);
}

#[test]
fn kill_process_in_respects_categories() {
    let mut q = queue();
    let p = process(Parse, &["parse"]);
    let id = p.id();
    q.add_to_queue(p, EnqueueMode::Append);

    assert!(q.kill_process_in(&[Analyze, Log]).is_empty());
    assert_eq!(active_id(&q), Some(id));

    let out = q.kill_process_in(&[Parse]);
    assert_eq!(interrupted(&out), vec![id]);
    assert!(q.is_idle());
}

#[test]
fn snapshot_lists_active_and_queued_in_dispatch_order() {
    let mut q = queue();
    let log = process(Log, &["log"]);
    let log_id = log.id();
    q.add_to_queue(log, EnqueueMode::Append);
    q.add_to_queue(process(Analyze, &["analyze"]), EnqueueMode::Append);
    q.add_to_queue(process(Version, &["analyzer-version"]), EnqueueMode::Append);

    let snapshot = q.snapshot();
    assert_eq!(snapshot.active.as_ref().map(|p| p.id), Some(log_id));
    let categories: Vec<ProcessCategory> = snapshot.queued.iter().map(|(c, _)| *c).collect();
    assert_eq!(categories, vec![Version, Analyze]);
    assert_eq!(snapshot.total_queued(), 2);
    assert_eq!(snapshot.queued_in(Analyze).len(), 1);
    assert!(snapshot.queued_in(Parse).is_empty());
}

#[test]
fn shutdown_disposes_everything() {
    let mut q = queue();
    let log = process(Log, &["log"]);
    let log_id = log.id();
    q.add_to_queue(log, EnqueueMode::Append);
    let queued = process(Analyze, &["analyze"]);
    let queued_id = queued.id();
    q.add_to_queue(queued, EnqueueMode::Append);

    let out = q.shutdown();

    assert_eq!(interrupted(&out), vec![log_id]);
    assert!(spawned(&out).is_empty());
    let removed: Vec<ProcessId> = statuses(&out)
        .into_iter()
        .filter(|(_, kind)| *kind == StatusKind::Removed)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(removed, vec![queued_id, log_id]);
    assert!(q.is_idle());
}
