//! Server lifecycle: bind, serve, and shut down on signal.

use crate::error::WebResult;
use crate::routes::create_router;
use crate::state::AppState;
use skystats_config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The SkyStats web server.
pub struct SkyStatsServer {
    config: Arc<Config>,
}

impl SkyStatsServer {
    /// Creates a server for a validated configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Builds the application and serves it until Ctrl-C or SIGTERM.
    pub async fn start(&self) -> WebResult<()> {
        let state = AppState::from_config(&self.config).await?;
        let app = create_router(state, self.config.server.permissive_cors);

        let listener = TcpListener::bind(self.config.server.bind_addr.as_str()).await?;
        info!("SkyStats listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("SkyStats stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
