//! Network servers: gRPC transport, HTTP health endpoint, and the task
//! handle that runs each on its own execution context.

pub mod config;
pub mod health;
pub mod middleware;
pub mod rpc;
pub mod server;

pub use config::ListenerConfig;
pub use health::HealthServer;
pub use rpc::RpcServer;
pub use server::{Server, ServerHandle, ShutdownSignal, StartupError, StopError};
