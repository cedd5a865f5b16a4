// src/main.rs

use std::process::ExitCode;

use checkrunner::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("checkrunner: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "run failed");
            eprintln!("checkrunner error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
