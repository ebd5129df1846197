//! HTTP host for the devdeck dashboard API.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, Services};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
pub const BIND_ENV: &str = "DEVDECK_BIND";
pub const MOBILE_DIR_ENV: &str = "DEVDECK_MOBILE_DIR";

/// Listener and mobile project settings; flags win over the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub mobile_dir: PathBuf,
}

impl ServerConfig {
    pub fn resolve(bind_flag: Option<&str>, mobile_dir_flag: Option<PathBuf>) -> Result<Self> {
        let bind = bind_flag
            .map(str::to_string)
            .or_else(|| non_blank_env(BIND_ENV))
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address: SocketAddr = bind
            .parse()
            .map_err(|error| anyhow!("invalid bind address '{bind}': {error}"))?;
        let mobile_dir = mobile_dir_flag
            .or_else(|| non_blank_env(MOBILE_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { bind_address, mobile_dir })
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub struct DevdeckServer {
    bind_address: SocketAddr,
    state: AppState,
}

impl DevdeckServer {
    pub fn new(bind_address: SocketAddr, state: AppState) -> Self {
        Self { bind_address, state }
    }

    /// Bind the listener and serve in the background.
    pub async fn start(self) -> Result<RunningServer> {
        let cancellation_token = CancellationToken::new();
        let listener = tokio::net::TcpListener::bind(self.bind_address).await?;
        let bound_address = listener.local_addr()?;
        let app = router(self.state);

        let server_handle = tokio::spawn({
            let shutdown = cancellation_token.child_token();
            async move {
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        shutdown.cancelled().await;
                    })
                    .await;
            }
        });
        info!(address = %bound_address, "devdeck server listening");

        Ok(RunningServer {
            bind_address: bound_address,
            cancellation_token,
            server_handle,
        })
    }
}

/// Handle to a running server.
#[derive(Debug)]
pub struct RunningServer {
    bind_address: SocketAddr,
    cancellation_token: CancellationToken,
    server_handle: JoinHandle<()>,
}

impl RunningServer {
    pub fn bound_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn stop(self) -> Result<()> {
        self.cancellation_token.cancel();
        self.server_handle
            .await
            .map_err(|error| anyhow!("devdeck server task failed: {error}"))?;
        info!(address = %self.bind_address, "devdeck server stopped");
        Ok(())
    }
}
