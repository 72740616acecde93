//! Control server.

use std::future::Future;
use std::net::SocketAddr;

use scrubber_config::ServerConfig;
use scrubber_core::ControlHandle;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::ApiError;
use crate::routes::create_router;

/// Serves the control router on the configured address.
pub struct ApiServer {
    config: ServerConfig,
    handle: ControlHandle,
}

impl ApiServer {
    pub fn new(config: ServerConfig, handle: ControlHandle) -> Self {
        Self { config, handle }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr_text = self.addr();
        let addr: SocketAddr = addr_text.parse().map_err(|e: std::net::AddrParseError| {
            ApiError::InvalidAddress {
                addr: addr_text.clone(),
                reason: e.to_string(),
            }
        })?;
        let listener = TcpListener::bind(addr).await.map_err(|source| ApiError::Bind {
            addr: addr_text,
            source,
        })?;

        info!("Control API listening on {}", addr);
        axum::serve(listener, create_router(self.handle))
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Control API stopped");
        Ok(())
    }
}
