use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use anyhow::Context;
use axum::{Extension, Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;

pub mod api;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod services;
pub mod utils;

use api::{
    health_controller::health_endpoint, proxy_controller::ProxyController,
    stream_controller::StreamController,
};
use services::AppServices;

static START_TIME: OnceLock<Instant> = OnceLock::new();

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn get_uptime_seconds() -> u64 {
    START_TIME.get_or_init(Instant::now).elapsed().as_secs()
}

pub struct ApplicationServer;

impl ApplicationServer {
    /// every route the relay answers, without the metrics endpoint
    pub fn router(services: AppServices) -> Router {
        START_TIME.get_or_init(Instant::now);

        Router::new()
            .nest(
                "/api/v1",
                ProxyController::app().merge(StreamController::app()),
            )
            .route("/health", get(health_endpoint))
            .layer(TraceLayer::new_for_http())
            .layer(Extension(services))
    }

    pub async fn serve(config: Arc<AppConfig>, services: AppServices) -> anyhow::Result<()> {
        let recorder = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install metrics recorder")?;

        let app = Self::router(services).route(
            "/metrics",
            get(move || Self::render_metrics(recorder.clone())),
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("relay listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .context("Server stopped unexpectedly")?;

        info!("relay shut down");
        Ok(())
    }

    async fn render_metrics(handle: PrometheusHandle) -> String {
        handle.render()
    }

    async fn shutdown_signal() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("shutdown signal received, draining connections...");
    }
}
