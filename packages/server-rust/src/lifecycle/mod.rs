//! Process lifecycle: ordered startup, termination signals, graceful stop.
//!
//! - [`state`]: the `Starting -> Running -> ShuttingDown -> Stopped` machine
//!   and its observable handle
//! - [`signals`]: SIGINT/SIGTERM to a single shutdown request
//! - [`orchestrator`]: drives the servers and the shared resource

pub mod orchestrator;
pub mod signals;
pub mod state;

pub use orchestrator::{Orchestrator, RunError, SHUTDOWN_TIMEOUT};
pub use signals::{spawn_listener, TerminationSignals};
pub use state::{BoundAddrs, Lifecycle, LifecycleState};
