//! gRPC server hosting the user service.
//!
//! Registers the handler and the v1 server-reflection service (for tools
//! such as `grpcurl`) before accepting connections. Reflection is always on.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server as TransportServer;
use tracing::info;
use usersvc_core::{UserService, UserServiceServer, FILE_DESCRIPTOR_SET};

use super::config::ListenerConfig;
use super::server::{Server, ShutdownSignal};

/// Serves a `user.v1.UserService` implementation over gRPC.
pub struct RpcServer<H> {
    config: ListenerConfig,
    handler: H,
    listener: Option<TcpListener>,
}

impl<H: UserService> RpcServer<H> {
    /// Creates the server without binding any port.
    #[must_use]
    pub fn new(config: ListenerConfig, handler: H) -> Self {
        Self {
            config,
            handler,
            listener: None,
        }
    }
}

#[async_trait]
impl<H: UserService> Server for RpcServer<H> {
    fn name(&self) -> &'static str {
        "grpc"
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

        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()?;

        TransportServer::builder()
            .timeout(self.config.request_timeout)
            .add_service(UserServiceServer::new(self.handler))
            .add_service(reflection)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await?;

        info!("gRPC server stopped");
        Ok(())
    }
}
