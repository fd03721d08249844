pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;

use crate::monitor::Monitor;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct ApiServer {
    monitor: Arc<Monitor>,
}

impl ApiServer {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }

    /// Binds the server to the configured port and serves until Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        let app = router::build(Arc::clone(&self.monitor))
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.monitor.config().api_port));

        tracing::info!("API server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
