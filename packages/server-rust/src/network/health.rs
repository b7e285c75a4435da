//! Plain HTTP liveness endpoint.
//!
//! `GET /health` answers `200 OK` for as long as the process and this
//! listener are alive. It never consults the gRPC server or the database.
//! Each [`HealthServer`] builds its own router, so several instances can
//! coexist in one process.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::ListenerConfig;
use super::middleware::build_http_layers;
use super::server::{Server, ShutdownSignal};

/// Liveness check handler.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Builds the health router with its middleware stack.
pub fn build_router(config: &ListenerConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .layer(build_http_layers(config))
}

/// Serves the health router.
pub struct HealthServer {
    config: ListenerConfig,
    listener: Option<TcpListener>,
}

impl HealthServer {
    /// Creates the server without binding any port.
    #[must_use]
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            listener: None,
        }
    }
}

#[async_trait]
impl Server for HealthServer {
    fn name(&self) -> &'static str {
        "http"
    }

    fn bind_address(&self) -> &str {
        &self.config.bind_address
    }

    async fn bind(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    async fn serve(self, shutdown: ShutdownSignal) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("bind() must be called before serve()"))?;
        let router = build_router(&self.config);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
