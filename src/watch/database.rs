// src/watch/database.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Emitted when a compilation database appears or disappears at one of the
/// candidate locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEvent {
    LocationChanged { path: PathBuf },
}

/// Handle for the database watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop watching.
pub struct DatabaseWatcherHandle {
    _inner: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl DatabaseWatcherHandle {
    /// Directories actually being watched.
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched
    }
}

impl std::fmt::Debug for DatabaseWatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseWatcherHandle")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

/// Creation, removal and renames can change which candidate exists. Content
/// edits cannot.
pub fn is_location_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Candidates touched by `event`, if it is a location change.
pub fn affected_candidates(event: &Event, candidates: &[PathBuf]) -> Vec<PathBuf> {
    if !is_location_change(&event.kind) {
        return Vec::new();
    }

    candidates
        .iter()
        .filter(|candidate| event.paths.iter().any(|p| p == *candidate))
        .cloned()
        .collect()
}

/// Rewrite candidates onto canonical parent directories so they compare
/// equal to the paths notify reports. Candidates whose directory does not
/// exist are dropped: there is nothing to watch yet.
fn normalize_candidates(candidates: &[PathBuf]) -> Vec<PathBuf> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let parent = candidate.parent().filter(|p| !p.as_os_str().is_empty())?;
            let name = candidate.file_name()?;
            match parent.canonicalize() {
                Ok(dir) => Some(dir.join(name)),
                Err(_) => {
                    debug!(dir = %parent.display(), "candidate directory missing; not watched");
                    None
                }
            }
        })
        .collect()
}

/// Spawn a watcher on the parent directories of every candidate database
/// path, sending `DatabaseEvent::LocationChanged` into `tx` whenever a
/// candidate is created, removed or renamed.
pub fn spawn_database_watcher(
    candidates: &[PathBuf],
    tx: mpsc::Sender<DatabaseEvent>,
) -> Result<DatabaseWatcherHandle> {
    let candidates = normalize_candidates(candidates);

    let dirs: BTreeSet<&Path> = candidates.iter().filter_map(|c| c.parent()).collect();
    let dirs: Vec<PathBuf> = dirs.into_iter().map(Path::to_path_buf).collect();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("checkrunner: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("checkrunner: database watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for dir in &dirs {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
    }

    info!(?dirs, "compilation database watcher started");

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            for path in affected_candidates(&event, &candidates) {
                debug!(path = %path.display(), kind = ?event.kind, "database location changed");
                if tx.send(DatabaseEvent::LocationChanged { path }).await.is_err() {
                    debug!("database event receiver dropped; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("database watcher loop finished");
    });

    Ok(DatabaseWatcherHandle {
        _inner: watcher,
        watched: dirs,
    })
}
