use anyhow::Result;
use ocr_api::AppState;
use ocr_control::CooldownSweeper;
use ocr_engine::TesseractEngine;
use ocr_metrics::{MetricsService, TracingService};
use ocr_models::Config;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(err) => {
            warn!("Unable to listen for shutdown signal: {}", err);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = ocr_at_home::config_path();
    let config = Config::load(&config_path)?;

    TracingService::init(&config.logging)?;
    info!("Starting OCR@Home server");
    info!("Configuration loaded from {}: {:?}", config_path.display(), config);

    // A missing engine is not fatal; requests report it individually.
    let engine = Arc::new(TesseractEngine::new(&config.engine));
    match engine.version().await {
        Ok(version) => info!("Using {}", version),
        Err(e) => warn!("Tesseract probe failed, OCR requests will fail: {}", e),
    }

    let metrics = Arc::new(MetricsService::new()?);
    let state = AppState::new(config.clone(), engine, metrics)?;

    let sweeper_handle = {
        let cooldowns = state.executor.cooldowns().clone();
        tokio::spawn(async move {
            CooldownSweeper::new(cooldowns).start().await;
        })
    };

    info!(
        "OCR@Home server starting on {}:{} (max concurrency {}, engine timeout {} ms)",
        config.server.bind,
        config.server.port,
        config.limits.max_concurrency,
        config.engine.timeout_ms
    );

    let served = ocr_api::start_server(state, shutdown_signal()).await;

    info!("Shutting down OCR@Home server...");
    sweeper_handle.abort();

    served.map_err(|e| anyhow::anyhow!("OCR API server error: {e}"))?;
    info!("OCR@Home server shutdown complete");
    Ok(())
}
