//! Listener configuration shared by the gRPC and health servers.

use std::time::Duration;

use crate::config::Config;

/// Where a server binds and how long a single request may run.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// `host:port` to bind. Port 0 means OS-assigned.
    pub bind_address: String,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:0".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ListenerConfig {
    /// Listener for the gRPC transport.
    #[must_use]
    pub fn rpc(config: &Config) -> Self {
        Self {
            bind_address: config.rpc_bind_address(),
            ..Self::default()
        }
    }

    /// Listener for the health endpoint.
    #[must_use]
    pub fn http(config: &Config) -> Self {
        Self {
            bind_address: config.http_bind_address(),
            ..Self::default()
        }
    }

    /// Loopback listener on an OS-assigned port.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            ..Self::default()
        }
    }
}
