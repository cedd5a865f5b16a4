// src/lib.rs

pub mod bridge;
pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod process;
pub mod queue;
pub mod types;
pub mod watch;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::bridge::{ExecutorBridge, SubmittedRun};
use crate::cli::{CliArgs, Command};
use crate::command::{DatabaseLocator, candidate_paths};
use crate::config::{Settings, VariableContext, load_or_default};
use crate::exec::RealProcessBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::process::StatusKind;
use crate::queue::{QueueHandle, QueueOptions, spawn_queue};
use crate::watch::{DatabaseEvent, spawn_database_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading
/// - the execution queue and the real process backend
/// - the bridge operations behind each subcommand
/// - forwarding of tool output to the terminal
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let workspace = resolve_workspace(args.workspace.as_deref())?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let file = load_or_default(fs.as_ref(), args.config.as_deref(), Some(&workspace))?;
    let settings = Settings::new(file, VariableContext::new(Some(workspace.clone())));

    let options = QueueOptions {
        workspace_root: Some(workspace.clone()),
        broadcast_capacity: settings.broadcast_capacity(),
        ..QueueOptions::default()
    };
    let (queue, queue_task) = spawn_queue(options, RealProcessBackend::new);

    forward_output(&queue, args.command.streams_tool_stdout());

    // Ctrl-C → interrupt the running tool.
    {
        let queue = queue.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                info!("Ctrl-C received; killing the active process");
                if queue.kill_process().await.is_err() {
                    return;
                }
            }
        });
    }

    let locator = DatabaseLocator::new(Arc::clone(&fs));
    let bridge = ExecutorBridge::new(queue.clone(), settings, locator);

    let outcome = run_command(&bridge, &args.command).await;

    queue.shutdown().await?;
    queue_task.await.context("queue task panicked")??;

    outcome
}

async fn run_command(bridge: &ExecutorBridge, command: &Command) -> Result<()> {
    match command {
        Command::Version => {
            let version = bridge.ensure_version().await?;
            println!("{version}");
        }
        Command::Analyze { files } => {
            let runs = if files.is_empty() {
                vec![bridge.analyze_project().await?]
            } else {
                bridge.analyze_files(files).await?
            };
            await_runs(runs).await?;
        }
        Command::Log { build } => {
            let _watcher = watch_database(bridge);
            let run = bridge.run_log(build.as_deref()).await?;
            await_runs(vec![run]).await?;
        }
        Command::Parse { files } => match bridge.parse_reports(files).await? {
            Some(json) => println!("{json}"),
            None => bail!("parse did not finish"),
        },
        Command::Checkers => match bridge.reload_checker_data().await? {
            Some(json) => println!("{json}"),
            None => bail!("checker listing did not finish"),
        },
    }
    Ok(())
}

fn resolve_workspace(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("reading current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("workspace folder {:?} is not accessible", dir))
}

/// Copy the queue's shared output streams to the terminal.
fn forward_output(queue: &QueueHandle, include_stdout: bool) {
    if include_stdout {
        let rx = queue.subscribe_stdout();
        tokio::spawn(pump(rx, std::io::stdout));
    }
    let rx = queue.subscribe_stderr();
    tokio::spawn(pump(rx, std::io::stderr));
}

async fn pump<W, F>(mut rx: broadcast::Receiver<String>, writer: F)
where
    W: Write,
    F: Fn() -> W,
{
    loop {
        match rx.recv().await {
            Ok(chunk) => {
                let mut out = writer();
                if out.write_all(chunk.as_bytes()).and_then(|_| out.flush()).is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "terminal output fell behind; chunks dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Follow every submitted run to its end. Fails if any of them errored, was
/// killed or was removed before it ran.
async fn await_runs(runs: Vec<SubmittedRun>) -> Result<()> {
    let mut failed = Vec::new();

    for run in runs {
        let info = run.info.clone();
        match run.finish().await {
            Some(status)
                if matches!(
                    status.kind,
                    StatusKind::Errored | StatusKind::Killed | StatusKind::Removed
                ) =>
            {
                warn!(process_id = %info.id, %status, "run did not complete");
                failed.push(format!("'{}' {status}", info.command_line));
            }
            Some(status) => debug!(process_id = %info.id, %status, "run ended"),
            None => debug!(process_id = %info.id, "run merged into an identical queued entry"),
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        bail!("run ended: {}", failed.join("; "))
    }
}

/// Report database appearance/removal while a log run rewrites it.
fn watch_database(bridge: &ExecutorBridge) -> Option<crate::watch::DatabaseWatcherHandle> {
    let settings = bridge.settings();
    let configured = settings.compilation_database_path();
    let candidates = candidate_paths(configured.as_deref(), settings.workspace_folder());

    let (tx, mut rx) = mpsc::channel::<DatabaseEvent>(16);
    let handle = match spawn_database_watcher(&candidates, tx) {
        Ok(handle) => handle,
        Err(err) => {
            warn!(error = %err, "could not watch compilation database locations");
            return None;
        }
    };

    tokio::spawn(async move {
        while let Some(DatabaseEvent::LocationChanged { path }) = rx.recv().await {
            info!(path = %path.display(), "compilation database location changed");
        }
    });

    Some(handle)
}
