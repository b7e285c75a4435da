//! OS termination signals.
//!
//! SIGINT and SIGTERM are translated into a single cancellation of the
//! orchestrator's shutdown token. Later signals are logged and otherwise
//! ignored; cancelling an already-cancelled token is a no-op.

use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
#[cfg(not(unix))]
use tracing::error;
use tracing::info;

/// The set of signals that trigger graceful shutdown.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    /// Installs the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler cannot be registered.
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Installs the signal handlers.
    ///
    /// # Errors
    ///
    /// Never fails on this platform; `ctrl_c` is registered lazily.
    #[cfg(not(unix))]
    pub fn register() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for the next termination signal and returns its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    /// Waits for the next termination signal and returns its name.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

/// Spawns a task that cancels `shutdown` on the first termination signal.
///
/// Takes already-registered handlers so no signal sent after registration
/// falls through to the default OS disposition.
pub fn spawn_listener(
    mut signals: TerminationSignals,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!(signal, "Termination signal received");
        shutdown.cancel();

        loop {
            let signal = signals.recv().await;
            info!(signal, "Shutdown already in progress, ignoring signal");
        }
    })
}
