//! `usersvc` server: a gRPC user service and an HTTP liveness endpoint
//! sharing one `PostgreSQL` pool, with ordered startup and graceful shutdown.

pub mod app;
pub mod config;
pub mod domain;
pub mod lifecycle;
pub mod network;
pub mod observability;
pub mod storage;

pub use config::{Config, Secret};
pub use lifecycle::{Lifecycle, LifecycleState, Orchestrator, RunError, SHUTDOWN_TIMEOUT};
pub use storage::{Database, SharedResource};

