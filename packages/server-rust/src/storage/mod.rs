//! Shared storage resources for the `usersvc` server.
//!
//! Holds the single [`Database`] pool opened at startup and the
//! [`SharedResource`] seam the lifecycle orchestrator uses to release it.

pub mod database;

pub use database::{ConnectionError, Database, PoolConfig, SharedResource};
