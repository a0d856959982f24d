use std::sync::Arc;
use std::time::Duration;
use ocr_control::OcrExecutor;
use ocr_engine::OcrEngine;
use ocr_metrics::MetricsService;
use ocr_models::{Config, OcrError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub executor: Arc<OcrExecutor>,
    pub metrics: Arc<MetricsService>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: Config,
        engine: Arc<dyn OcrEngine>,
        metrics: Arc<MetricsService>,
    ) -> Result<Self, OcrError> {
        let executor = Arc::new(OcrExecutor::new(&config, engine, metrics.clone()));
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch.timeout_ms))
            .build()
            .map_err(|e| OcrError::InternalError {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            executor,
            metrics,
            http,
        })
    }
}
