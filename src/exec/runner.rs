// src/exec/runner.rs

//! Individual OS process runner.

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::process::{OutputStream, ProcessId, SpawnRequest};
use crate::queue::BackendEvent;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Run a single process to completion, streaming its output as
/// [`BackendEvent::Output`] chunks.
///
/// Exactly one of `SpawnFailed` or `Exited` is sent at the end, after both
/// pipes are drained. If the interrupt channel fires, the child gets a
/// single interrupt signal and is then awaited like any other exit. If the
/// channel is dropped instead, the child is killed on drop.
pub async fn run_process(
    request: SpawnRequest,
    events: mpsc::UnboundedSender<BackendEvent>,
    mut interrupt_rx: oneshot::Receiver<()>,
) {
    let id = request.id;

    let mut cmd = Command::new(&request.program);
    cmd.args(&request.args)
        .current_dir(&request.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(
                process_id = %id,
                program = %request.program,
                error = %err,
                "failed to spawn process"
            );
            send(&events, BackendEvent::SpawnFailed {
                id,
                message: err.to_string(),
            });
            return;
        }
    };

    let readers: Vec<JoinHandle<()>> = [
        child
            .stdout
            .take()
            .map(|out| spawn_reader(id, OutputStream::Stdout, out, events.clone())),
        child
            .stderr
            .take()
            .map(|err| spawn_reader(id, OutputStream::Stderr, err, events.clone())),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Either the process exits on its own, or the queue asks us to stop it.
    let waited = tokio::select! {
        status = child.wait() => status,

        signal = &mut interrupt_rx => match signal {
            Ok(()) => {
                info!(process_id = %id, "interrupt requested; signalling process");
                if let Err(err) = interrupt_child(&mut child) {
                    warn!(process_id = %id, error = %err, "failed to signal process");
                }
                child.wait().await
            }
            Err(_) => {
                debug!(process_id = %id, "backend dropped; killing process");
                return;
            }
        },
    };

    for reader in readers {
        if let Err(err) = reader.await {
            debug!(process_id = %id, error = %err, "output reader task failed");
        }
    }

    match waited {
        Ok(status) => {
            debug!(process_id = %id, exit_code = ?status.code(), "process closed");
            send(&events, BackendEvent::Exited {
                id,
                code: status.code(),
            });
        }
        Err(err) => {
            warn!(process_id = %id, error = %err, "failed waiting for process");
            send(&events, BackendEvent::SpawnFailed {
                id,
                message: err.to_string(),
            });
        }
    }
}

fn send(events: &mpsc::UnboundedSender<BackendEvent>, event: BackendEvent) {
    if events.send(event).is_err() {
        debug!("queue is gone; dropping backend event");
    }
}

fn spawn_reader<R>(
    id: ProcessId,
    stream: OutputStream,
    reader: R,
    events: mpsc::UnboundedSender<BackendEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(forward_chunks(id, stream, reader, events))
}

/// Forward raw chunks until EOF. Multi-byte characters split across reads
/// are held back until complete.
async fn forward_chunks<R>(
    id: ProcessId,
    stream: OutputStream,
    mut reader: R,
    events: mpsc::UnboundedSender<BackendEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                debug!(process_id = %id, ?stream, error = %err, "error reading process output");
                break;
            }
        };

        pending.extend_from_slice(&buf[..n]);
        let chunk = take_decoded(&mut pending);
        if chunk.is_empty() {
            continue;
        }

        if events
            .send(BackendEvent::Output { id, stream, chunk })
            .is_err()
        {
            return;
        }
    }

    if !pending.is_empty() {
        let chunk = String::from_utf8_lossy(&pending).into_owned();
        let _ = events.send(BackendEvent::Output { id, stream, chunk });
    }
}

/// Decode as much of `pending` as possible, leaving an incomplete trailing
/// UTF-8 sequence in place. Invalid bytes are replaced.
pub fn take_decoded(pending: &mut Vec<u8>) -> String {
    let complete = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        Err(_) => pending.len(),
    };

    let rest = pending.split_off(complete);
    let decoded = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    decoded
}

#[cfg(unix)]
fn interrupt_child(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // `None` once the child has been reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    kill(Pid::from_raw(pid), Signal::SIGINT).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn interrupt_child(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
