//! Ordered startup, signal wait, and time-bounded shutdown.
//!
//! The orchestrator owns the shared resource and both servers:
//!
//! 1. Spawns each server on its own task and awaits both bind reports
//! 2. Parks on the shutdown token (no polling)
//! 3. Stops the gRPC server, then the HTTP server, under one deadline
//! 4. Releases the shared resource on every exit path

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{BoundAddrs, Lifecycle};
use crate::network::{Server, ServerHandle, StartupError};
use crate::storage::{ConnectionError, SharedResource};

/// Budget for the whole graceful-stop phase, measured from the moment
/// shutdown begins. Shared by both servers, not per server.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Why the process could not run to a graceful stop.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("{server} server exited unexpectedly")]
    ServerExited { server: &'static str },
}

/// Drives an RPC server and an HTTP server through their lifecycle.
pub struct Orchestrator<R, A, B> {
    resource: R,
    rpc: A,
    http: B,
    lifecycle: Lifecycle,
}

impl<R, A, B> Orchestrator<R, A, B>
where
    R: SharedResource,
    A: Server,
    B: Server,
{
    /// Takes ownership of the resource and both (unbound) servers.
    #[must_use]
    pub fn new(resource: R, rpc: A, http: B) -> Self {
        Self {
            resource,
            rpc,
            http,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Returns a handle for observing state transitions.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Runs until `shutdown` is cancelled, then stops both servers and
    /// releases the resource.
    ///
    /// Cancelling `shutdown` more than once has no additional effect.
    ///
    /// # Errors
    ///
    /// [`RunError::Startup`] if either listener fails to bind,
    /// [`RunError::ServerExited`] if a server stops on its own while running.
    /// Errors while stopping are logged, never returned.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), RunError> {
        let Self {
            resource,
            rpc,
            http,
            lifecycle,
        } = self;

        let result = drive(rpc, http, &lifecycle, &shutdown).await;

        resource.close().await;
        lifecycle.set_stopped();
        // The caller reports fatal errors, so only a graceful stop logs here.
        if result.is_ok() {
            info!(resource = resource.name(), "stopped");
        } else {
            debug!(resource = resource.name(), "stopped after fatal error");
        }
        result
    }
}

async fn drive<A: Server, B: Server>(
    rpc: A,
    http: B,
    lifecycle: &Lifecycle,
    shutdown: &CancellationToken,
) -> Result<(), RunError> {
    let mut rpc = ServerHandle::spawn(rpc);
    let mut http = ServerHandle::spawn(http);

    // A server whose bind failed has already ended its task; only the one
    // that came up needs stopping.
    let addrs = match tokio::join!(rpc.ready(), http.ready()) {
        (Ok(rpc_addr), Ok(http_addr)) => BoundAddrs {
            rpc: rpc_addr,
            http: http_addr,
        },
        (Err(e), Ok(_)) => {
            stop_one(http, Instant::now() + SHUTDOWN_TIMEOUT).await;
            return Err(e.into());
        }
        (Ok(_), Err(e)) => {
            stop_one(rpc, Instant::now() + SHUTDOWN_TIMEOUT).await;
            return Err(e.into());
        }
        (Err(e), Err(_)) => return Err(e.into()),
    };

    lifecycle.set_running(addrs);
    info!(grpc = %addrs.rpc, http = %addrs.http, "Running");

    let exited = tokio::select! {
        () = shutdown.cancelled() => None,
        server = rpc.wait() => Some(server),
        server = http.wait() => Some(server),
    };

    if let Some(server) = exited {
        stop_in_order(rpc, http, Instant::now() + SHUTDOWN_TIMEOUT).await;
        return Err(RunError::ServerExited { server });
    }

    let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
    lifecycle.begin_shutdown();
    info!(timeout_secs = SHUTDOWN_TIMEOUT.as_secs(), "shutting down");
    stop_in_order(rpc, http, deadline).await;
    Ok(())
}

/// Stops `first`, then `second`, both bounded by the same `deadline`.
async fn stop_in_order(first: ServerHandle, second: ServerHandle, deadline: Instant) {
    stop_one(first, deadline).await;
    stop_one(second, deadline).await;
}

async fn stop_one(handle: ServerHandle, deadline: Instant) {
    let server = handle.name();
    match handle.stop(deadline).await {
        Ok(()) => info!(server, "Server stopped"),
        Err(e) => warn!(server, error = %e, "Server did not stop cleanly"),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::lifecycle::LifecycleState;
    use crate::network::ShutdownSignal;

    type EventLog = Arc<Mutex<Vec<String>>>;

    /// Records bind, shutdown and exit events into a shared log.
    struct StubServer {
        name: &'static str,
        log: EventLog,
        fail_bind: bool,
        /// Time spent draining after the shutdown signal.
        drain: Duration,
        /// Exit on its own this long after starting to serve.
        crash_after: Option<Duration>,
    }

    impl StubServer {
        fn new(name: &'static str, log: &EventLog) -> Self {
            Self {
                name,
                log: Arc::clone(log),
                fail_bind: false,
                drain: Duration::ZERO,
                crash_after: None,
            }
        }
    }

    #[async_trait]
    impl Server for StubServer {
        fn name(&self) -> &'static str {
            self.name
        }

        fn bind_address(&self) -> &str {
            "127.0.0.1:0"
        }

        async fn bind(&mut self) -> io::Result<SocketAddr> {
            if self.fail_bind {
                return Err(io::Error::from(io::ErrorKind::AddrInUse));
            }
            self.log.lock().unwrap().push(format!("bind:{}", self.name));
            Ok(SocketAddr::from(([127, 0, 0, 1], 0)))
        }

        async fn serve(self, shutdown: ShutdownSignal) -> anyhow::Result<()> {
            if let Some(after) = self.crash_after {
                tokio::time::sleep(after).await;
                self.log.lock().unwrap().push(format!("crash:{}", self.name));
                anyhow::bail!("listener closed");
            }
            shutdown.await;
            self.log.lock().unwrap().push(format!("shutdown:{}", self.name));
            tokio::time::sleep(self.drain).await;
            self.log.lock().unwrap().push(format!("stopped:{}", self.name));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct CountingResource {
        closes: Arc<AtomicU32>,
        log: Option<EventLog>,
    }

    #[async_trait]
    impl SharedResource for CountingResource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &self.log {
                log.lock().unwrap().push("close".to_string());
            }
        }
    }

    fn setup() -> (EventLog, CountingResource) {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let resource = CountingResource {
            closes: Arc::new(AtomicU32::new(0)),
            log: Some(Arc::clone(&log)),
        };
        (log, resource)
    }

    fn count(log: &EventLog, event: &str) -> usize {
        log.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    #[tokio::test]
    async fn reaches_running_then_stops_in_order() {
        let (log, resource) = setup();
        let orchestrator = Orchestrator::new(
            resource.clone(),
            StubServer::new("grpc", &log),
            StubServer::new("http", &log),
        );
        let lifecycle = orchestrator.lifecycle();
        let token = CancellationToken::new();
        let run = tokio::spawn(orchestrator.run(token.clone()));

        assert!(lifecycle.running().await.is_some());
        assert_eq!(lifecycle.state(), LifecycleState::Running);

        token.cancel();
        run.await.unwrap().unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(resource.closes.load(Ordering::SeqCst), 1);

        let events = log.lock().unwrap().clone();
        let tail: Vec<&str> = events[2..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            [
                "shutdown:grpc",
                "stopped:grpc",
                "shutdown:http",
                "stopped:http",
                "close"
            ]
        );
    }

    #[tokio::test]
    async fn one_shutdown_transition_per_cancel() {
        let (log, resource) = setup();
        let orchestrator = Orchestrator::new(
            resource.clone(),
            StubServer::new("grpc", &log),
            StubServer::new("http", &log),
        );
        let lifecycle = orchestrator.lifecycle();
        let token = CancellationToken::new();
        let run = tokio::spawn(orchestrator.run(token.clone()));

        lifecycle.running().await;
        token.cancel();
        token.cancel();
        run.await.unwrap().unwrap();
        token.cancel();

        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert_eq!(count(&log, "shutdown:grpc"), 1);
        assert_eq!(count(&log, "shutdown:http"), 1);
        assert_eq!(count(&log, "close"), 1);
        assert!(!lifecycle.begin_shutdown(), "shutdown must not re-trigger");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_shutting_down_has_no_effect() {
        let (log, resource) = setup();
        let mut rpc = StubServer::new("grpc", &log);
        rpc.drain = Duration::from_secs(2);
        let orchestrator = Orchestrator::new(resource.clone(), rpc, StubServer::new("http", &log));
        let lifecycle = orchestrator.lifecycle();
        let mut states = lifecycle.subscribe();
        let token = CancellationToken::new();
        let run = tokio::spawn(orchestrator.run(token.clone()));

        lifecycle.running().await;
        token.cancel();
        states
            .wait_for(|s| *s == LifecycleState::ShuttingDown)
            .await
            .unwrap();

        token.cancel();
        assert_eq!(lifecycle.state(), LifecycleState::ShuttingDown);
        assert_eq!(count(&log, "stopped:grpc"), 0, "rpc is still draining");

        run.await.unwrap().unwrap();
        assert_eq!(count(&log, "shutdown:grpc"), 1);
        assert_eq!(count(&log, "shutdown:http"), 1);
        assert_eq!(count(&log, "stopped:grpc"), 1);
        assert_eq!(count(&log, "close"), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn cancel_before_running_still_starts_then_stops() {
        let (log, resource) = setup();
        let orchestrator = Orchestrator::new(
            resource.clone(),
            StubServer::new("grpc", &log),
            StubServer::new("http", &log),
        );
        let token = CancellationToken::new();
        token.cancel();

        orchestrator.run(token).await.unwrap();
        assert_eq!(count(&log, "bind:grpc"), 1);
        assert_eq!(count(&log, "stopped:http"), 1);
        assert_eq!(resource.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_rpc_stop_is_abandoned_at_deadline() {
        let (log, resource) = setup();
        let mut rpc = StubServer::new("grpc", &log);
        rpc.drain = Duration::from_secs(3600);
        let orchestrator = Orchestrator::new(resource.clone(), rpc, StubServer::new("http", &log));
        let lifecycle = orchestrator.lifecycle();
        let token = CancellationToken::new();
        token.cancel();

        let started = Instant::now();
        orchestrator.run(token).await.unwrap();

        assert!(started.elapsed() <= SHUTDOWN_TIMEOUT + Duration::from_millis(100));
        assert_eq!(count(&log, "stopped:grpc"), 0, "rpc drain must be cut off");
        assert_eq!(resource.closes.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn http_gets_remaining_budget() {
        let (log, resource) = setup();
        let mut rpc = StubServer::new("grpc", &log);
        rpc.drain = Duration::from_secs(4);
        let mut http = StubServer::new("http", &log);
        http.drain = Duration::from_secs(8);
        let orchestrator = Orchestrator::new(resource.clone(), rpc, http);
        let token = CancellationToken::new();
        token.cancel();

        let started = Instant::now();
        orchestrator.run(token).await.unwrap();

        // 4s + 8s exceeds the shared 10s budget, so http is cut off.
        assert_eq!(count(&log, "stopped:grpc"), 1);
        assert_eq!(count(&log, "stopped:http"), 0);
        assert!(started.elapsed() <= SHUTDOWN_TIMEOUT + Duration::from_millis(100));
        assert_eq!(resource.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bind_failure_is_fatal_and_releases_resource() {
        let (log, resource) = setup();
        let mut http = StubServer::new("http", &log);
        http.fail_bind = true;
        let orchestrator = Orchestrator::new(resource.clone(), StubServer::new("grpc", &log), http);
        let lifecycle = orchestrator.lifecycle();

        let err = orchestrator.run(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Startup(StartupError::Bind { server: "http", .. })
        ));
        assert_eq!(resource.closes.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        assert!(lifecycle.addrs().is_none());
        // The server that did bind is stopped again.
        assert_eq!(count(&log, "stopped:grpc"), 1);
    }

    #[tokio::test]
    async fn server_exit_while_running_is_fatal() {
        let (log, resource) = setup();
        let mut rpc = StubServer::new("grpc", &log);
        rpc.crash_after = Some(Duration::from_millis(20));
        let orchestrator = Orchestrator::new(resource.clone(), rpc, StubServer::new("http", &log));
        let lifecycle = orchestrator.lifecycle();

        let err = orchestrator.run(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, RunError::ServerExited { server: "grpc" }));
        assert_eq!(count(&log, "stopped:http"), 1);
        assert_eq!(resource.closes.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }
}
