//! Lifecycle state shared between the orchestrator and observers.
//!
//! Uses a `watch` channel so observers can read the current state or await
//! a transition without polling.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

/// Orchestrator state.
///
/// State machine: Starting -> Running -> ShuttingDown -> Stopped. A fatal
/// error moves straight to Stopped from Starting or Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// Listeners are being bound.
    Starting,
    /// Both listeners are bound and serving.
    Running,
    /// A termination signal arrived; servers are being stopped.
    ShuttingDown,
    /// Servers are stopped (or abandoned at the deadline) and the shared
    /// resource is released.
    Stopped,
}

/// Local addresses of both listeners, known once Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    pub rpc: SocketAddr,
    pub http: SocketAddr,
}

#[derive(Debug)]
struct Inner {
    state: watch::Sender<LifecycleState>,
    addrs: OnceLock<BoundAddrs>,
}

/// Cheaply cloneable view of the orchestrator's lifecycle.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    /// Creates a lifecycle in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(LifecycleState::Starting);
        Self {
            inner: Arc::new(Inner {
                state,
                addrs: OnceLock::new(),
            }),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Returns a receiver notified on every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Listener addresses, once both are bound.
    #[must_use]
    pub fn addrs(&self) -> Option<BoundAddrs> {
        self.inner.addrs.get().copied()
    }

    /// Waits until the lifecycle reaches `Running` or any later state.
    ///
    /// Returns the bound addresses, or `None` if startup failed before both
    /// listeners were bound.
    pub async fn running(&self) -> Option<BoundAddrs> {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| *s >= LifecycleState::Running).await;
        self.addrs()
    }

    /// Starting -> Running. Returns `false` if not in `Starting`.
    pub(crate) fn set_running(&self, addrs: BoundAddrs) -> bool {
        // Record addresses before publishing so observers woken by the
        // transition can read them.
        let _ = self.inner.addrs.set(addrs);
        self.transition(LifecycleState::Starting, LifecycleState::Running)
    }

    /// Running -> ShuttingDown. Returns `false` if not in `Running`, so a
    /// repeated request has no effect.
    pub(crate) fn begin_shutdown(&self) -> bool {
        self.transition(LifecycleState::Running, LifecycleState::ShuttingDown)
    }

    /// Any state -> Stopped. Returns `false` if already stopped.
    pub(crate) fn set_stopped(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == LifecycleState::Stopped {
                false
            } else {
                *state = LifecycleState::Stopped;
                true
            }
        })
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
