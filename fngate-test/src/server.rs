//! Test server management

use fngate_runtime::{gateway_router, GatewayState, InvocationCoordinator, ModuleLoader};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::client::GatewayClient;

/// A gateway served on a random local port
pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve a gateway whose handler is loaded through `loader`
    pub async fn start(loader: Arc<dyn ModuleLoader>) -> Result<Self, TestError> {
        Self::start_with_state(GatewayState::new(InvocationCoordinator::new(loader))).await
    }

    /// Serve a gateway with fully configured state
    pub async fn start_with_state(state: GatewayState) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = gateway_router(Arc::new(state));

        info!(addr = %addr, "Starting fngate test server");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "Test server stopped");
            }
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            handle,
        })
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Get the port
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Get a client for this server
    pub fn client(&self) -> GatewayClient {
        GatewayClient::new(self.base_url.clone())
    }

    /// Stop the server
    pub fn stop(&self) {
        info!(addr = %self.addr, "Stopping fngate test server");
        self.handle.abort();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Errors that can occur with test server
#[derive(Debug, Error)]
pub enum TestError {
    #[error("Failed to bind test server: {0}")]
    Bind(#[from] std::io::Error),
}
