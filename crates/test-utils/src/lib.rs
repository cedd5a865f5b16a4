pub mod builders;
pub mod fake_backend;

use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;

use checkrunner::logging::LOG_ENV_VAR;
use checkrunner::queue::{QueueHandle, QueueOptions, spawn_queue};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt};

use crate::fake_backend::FakeControl;

/// Upper bound for anything a test awaits on the queue or a real process.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

static SUBSCRIBER: Once = Once::new();

/// Route `tracing` output into the test harness, once per test binary.
///
/// Reads the same `CHECKRUNNER_LOG` directives as the binary; without them
/// only warnings from checkrunner show up, and only for failing tests.
pub fn init_tracing() {
    SUBSCRIBER.call_once(|| {
        let directives = std::env::var(LOG_ENV_VAR).unwrap_or_default();
        let filter = EnvFilter::try_new(&directives)
            .ok()
            .filter(|_| !directives.trim().is_empty())
            .unwrap_or_else(|| EnvFilter::new("checkrunner=warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_DEADLINE`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(TEST_DEADLINE, f).await {
        Ok(value) => value,
        Err(_) => panic!("no result within {TEST_DEADLINE:?}"),
    }
}

/// Spawn a queue actor driven by `control`'s fake backend.
pub fn spawn_fake_queue(
    control: &FakeControl,
    workspace_root: Option<PathBuf>,
) -> (QueueHandle, JoinHandle<checkrunner::errors::Result<()>>) {
    let options = QueueOptions {
        workspace_root,
        ..QueueOptions::default()
    };
    spawn_queue(options, |events| control.backend(events))
}
