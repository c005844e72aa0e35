//! TCP listener for the restart service

use super::api::{router, ApiState};
use crate::error::{Result, ServiceError};
use tokio::net::TcpListener;
use tracing::{error, info};

/// HTTP daemon serving the restart API
pub struct RestartDaemon {
    state: ApiState,
}

impl RestartDaemon {
    pub fn new(state: ApiState) -> Self {
        Self { state }
    }

    /// Bind `host:port` and serve until SIGINT or SIGTERM
    pub async fn run(self, host: &str, port: u16) -> Result<()> {
        let listener = TcpListener::bind((host, port)).await?;
        info!("Listening on {}:{}", host, port);
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServiceError::Server(e.to_string()))
    }
}

/// Resolve on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
