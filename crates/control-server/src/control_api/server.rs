/// Control server implementation
use super::routes::{create_router, AppState};
use crate::station::Station;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// HTTP control server
pub struct ControlServer {
    addr: SocketAddr,
    station: Arc<Station>,
    server_handle: Option<JoinHandle<()>>,
}

impl ControlServer {
    /// Create a new control server
    ///
    /// # Arguments
    /// * `addr` - Address to bind to (e.g., "0.0.0.0:8000")
    /// * `station` - Shared station facade
    pub fn new(addr: SocketAddr, station: Arc<Station>) -> Self {
        Self {
            addr,
            station,
            server_handle: None,
        }
    }

    /// Bind and start serving on a background task
    ///
    /// When bound to port 0 the actual port is available from [`Self::addr`] afterwards.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting control server on {}", self.addr);

        let app = create_router(AppState {
            station: self.station.clone(),
        });

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        self.addr = listener.local_addr().context("Failed to read bound address")?;
        info!("Control server listening on {}", self.addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Control server error: {}", e);
            }
        });

        self.server_handle = Some(handle);

        Ok(())
    }

    /// Stop serving
    pub async fn stop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            info!("Stopping control server");
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.server_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}
