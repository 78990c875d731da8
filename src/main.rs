/// Sky-watch: periodic frame capture and weather analysis service
mod clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod repo;
mod routes;
mod scheduler;
mod services;
mod utils;

#[cfg(test)]
mod test_support;

use crate::clients::{AnthropicClient, FrameSource, HttpClient, LocatorFrameSource};
use crate::config::{AppConfig, API_KEY_VAR};
use crate::handlers::AppState;
use crate::repo::{AnalysisRepo, CaptureRepo};
use crate::routes::build_router;
use crate::scheduler::Scheduler;
use crate::services::{AnalysisService, CaptureService};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!(
        source = %config.capture.source_url,
        save_dir = %config.capture.save_dir.display(),
        image_url = %config.analysis.image_url,
        model = %config.analysis.model,
        "Configuration loaded successfully"
    );

    tokio::fs::create_dir_all(&config.capture.save_dir).await?;

    // Initialize clients
    let http = HttpClient::new()?;
    let source: Arc<dyn FrameSource> = Arc::new(
        LocatorFrameSource::new(http.clone(), config.app_root.clone())
            .with_ffmpeg(config.ffmpeg_bin.clone()),
    );
    let inference = AnthropicClient::new(http, config.api_key.clone());
    if !inference.has_credential() {
        warn!("{} is not set; weather analysis will fail until it is provided", API_KEY_VAR);
    }

    // Initialize services
    let capture = Arc::new(Scheduler::new(CaptureService::new(
        CaptureRepo::new(config.capture.clone()),
        source.clone(),
    )));
    let analysis = Arc::new(Scheduler::new(AnalysisService::new(
        AnalysisRepo::new(config.analysis.clone()),
        source,
        Arc::new(inference),
    )));

    // Seed the latest slot before the analysis loop first reads it
    match capture.job().capture_once().await {
        Ok(record) => info!(path = %record.path.display(), "Initial capture stored"),
        Err(e) => error!(code = e.code(), error = %e, "Initial capture failed"),
    }

    capture.start();
    analysis.start();

    let state = AppState {
        capture: capture.clone(),
        analysis: analysis.clone(),
    };
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("sky_watch service listening on {}", config.bind_addr());

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    capture.stop();
    analysis.stop();
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
