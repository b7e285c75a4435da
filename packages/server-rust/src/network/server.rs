//! Server task management.
//!
//! Every protocol server implements [`Server`] and follows the deferred
//! startup pattern: `bind()` claims the listener, `serve()` accepts
//! connections until the shutdown future resolves. [`ServerHandle::spawn`]
//! runs both steps on a dedicated task and reports the bind result back over
//! a oneshot channel, so two servers can start without waiting on each other.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::info;

/// Future handed to [`Server::serve`]; resolves when the server must stop.
pub type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A network server driven on its own task by a [`ServerHandle`].
#[async_trait]
pub trait Server: Send + 'static {
    /// Short name used in log lines and errors (e.g. `"grpc"`).
    fn name(&self) -> &'static str;

    /// Configured `host:port`, reported when binding fails.
    fn bind_address(&self) -> &str;

    /// Binds the listener and returns the actual local address.
    async fn bind(&mut self) -> io::Result<SocketAddr>;

    /// Serves connections until `shutdown` resolves, then lets in-flight
    /// requests finish.
    async fn serve(self, shutdown: ShutdownSignal) -> anyhow::Result<()>;
}

/// A server failed to come up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{server} server failed to bind {addr}: {source}")]
    Bind {
        server: &'static str,
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{server} server exited before reporting readiness")]
    Aborted { server: &'static str },
}

/// A server did not stop cleanly.
#[derive(Debug, Error)]
pub enum StopError {
    #[error("{server} server did not stop before the shutdown deadline")]
    DeadlineElapsed { server: &'static str },

    #[error("{server} server failed: {source}")]
    Failed {
        server: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{server} server task panicked")]
    Panicked { server: &'static str },

    #[error("{server} server task was cancelled")]
    Cancelled { server: &'static str },
}

type TaskOutcome = Result<anyhow::Result<()>, JoinError>;

/// Owns one spawned server task.
///
/// Dropping the handle without calling [`stop`](ServerHandle::stop) also
/// signals the server to shut down, but nothing waits for it.
#[derive(Debug)]
pub struct ServerHandle {
    name: &'static str,
    bind_address: String,
    ready: Option<oneshot::Receiver<io::Result<SocketAddr>>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
    outcome: Option<TaskOutcome>,
}

impl ServerHandle {
    /// Spawns `server` on a new task: bind, report, then serve.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<S: Server>(mut server: S) -> Self {
        let name = server.name();
        let bind_address = server.bind_address().to_string();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let addr = match server.bind().await {
                Ok(addr) => addr,
                Err(e) => {
                    // The bind error is reported through `ready`; the task
                    // itself has nothing left to fail.
                    let _ = ready_tx.send(Err(e));
                    return Ok(());
                }
            };
            info!(server = name, address = %addr, "Listening");
            // The receiver is gone only if the orchestrator stopped waiting.
            let _ = ready_tx.send(Ok(addr));

            let shutdown: ShutdownSignal = Box::pin(async move {
                // A dropped sender also means shutdown.
                let _ = shutdown_rx.await;
            });
            server.serve(shutdown).await
        });

        Self {
            name,
            bind_address,
            ready: Some(ready_rx),
            shutdown: Some(shutdown_tx),
            task,
            outcome: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits until the server reports its bind result.
    ///
    /// # Errors
    ///
    /// [`StartupError::Bind`] if the listener could not be bound,
    /// [`StartupError::Aborted`] if the task ended without reporting or
    /// `ready` was already consumed.
    pub async fn ready(&mut self) -> Result<SocketAddr, StartupError> {
        let Some(ready) = self.ready.take() else {
            return Err(StartupError::Aborted { server: self.name });
        };
        match ready.await {
            Ok(Ok(addr)) => Ok(addr),
            Ok(Err(source)) => Err(StartupError::Bind {
                server: self.name,
                addr: self.bind_address.clone(),
                source,
            }),
            Err(_) => Err(StartupError::Aborted { server: self.name }),
        }
    }

    /// Resolves when the server task ends on its own, returning its name.
    ///
    /// Cancel-safe; the task outcome is kept for [`stop`](ServerHandle::stop).
    pub async fn wait(&mut self) -> &'static str {
        if self.outcome.is_none() {
            self.outcome = Some((&mut self.task).await);
        }
        self.name
    }

    /// Signals shutdown and waits for the task until `deadline`.
    ///
    /// The task is aborted if it is still running at the deadline.
    ///
    /// # Errors
    ///
    /// Returns a [`StopError`] describing why the server did not stop cleanly.
    pub async fn stop(mut self, deadline: Instant) -> Result<(), StopError> {
        let server = self.name;
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => match tokio::time::timeout_at(deadline, &mut self.task).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.task.abort();
                    return Err(StopError::DeadlineElapsed { server });
                }
            },
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(StopError::Failed { server, source }),
            Err(e) if e.is_panic() => Err(StopError::Panicked { server }),
            Err(_) => Err(StopError::Cancelled { server }),
        }
    }
}
