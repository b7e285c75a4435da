use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use usersvc_server::lifecycle::signals::{self, TerminationSignals};
use usersvc_server::observability::{self, LogFormat};
use usersvc_server::{app, Config};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();

    if let Err(e) = observability::init_tracing(LogFormat::from_env()) {
        eprintln!("failed to initialise logging: {e}");
    }

    let config = Config::from_env();
    info!(?config, "Starting usersvc");

    let termination = match TerminationSignals::register() {
        Ok(termination) => termination,
        Err(e) => {
            error!(error = %e, "Failed to register signal handlers");
            return ExitCode::FAILURE;
        }
    };
    let shutdown = CancellationToken::new();
    let _listener = signals::spawn_listener(termination, shutdown.clone());

    match app::run(config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "usersvc exited with error");
            ExitCode::FAILURE
        }
    }
}
