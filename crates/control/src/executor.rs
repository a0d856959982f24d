use chrono::Utc;
use ocr_engine::{assemble, prepare, EngineOptions, ImageLimits, OcrEngine, PreparedImage};
use ocr_metrics::{MetricsService, TracingService};
use ocr_models::{Config, OcrError, OcrRequest, OcrResult};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

use crate::concurrency::Concurrency;
use crate::cooldown::Cooldowns;

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Runs one OCR request end to end: cooldown, concurrency gate, image
/// preparation, engine call under a deadline and layout assembly.
pub struct OcrExecutor {
    engine: Arc<dyn OcrEngine>,
    concurrency: Concurrency,
    cooldowns: Cooldowns,
    metrics: Arc<MetricsService>,
    limits: ImageLimits,
    default_language: String,
    page_segmentation_mode: u8,
    timeout: Duration,
}

impl OcrExecutor {
    pub fn new(config: &Config, engine: Arc<dyn OcrEngine>, metrics: Arc<MetricsService>) -> Self {
        Self {
            engine,
            concurrency: Concurrency::new(config.limits.max_concurrency as usize),
            cooldowns: Cooldowns::new(Duration::from_secs(config.cooldown.seconds)),
            metrics,
            limits: ImageLimits::from(&config.limits),
            default_language: config.engine.default_language.clone(),
            page_segmentation_mode: config.engine.page_segmentation_mode,
            timeout: Duration::from_millis(config.engine.timeout_ms),
        }
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    pub fn concurrency(&self) -> &Concurrency {
        &self.concurrency
    }

    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }

    pub fn metrics(&self) -> &Arc<MetricsService> {
        &self.metrics
    }

    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    pub async fn execute(&self, request: OcrRequest) -> Result<OcrResult, OcrError> {
        let started = Instant::now();
        let _in_flight = self.metrics.track_in_flight();

        let result = self.run(request, started).await;
        self.metrics.record_duration(millis(started.elapsed()));
        result
    }

    async fn run(&self, request: OcrRequest, started: Instant) -> Result<OcrResult, OcrError> {
        let request_id = request.request_id.to_string();

        if let Some(client_id) = &request.client_id {
            if let Err(e) = self.cooldowns.admit(client_id) {
                self.metrics.record_throttle();
                TracingService::log_throttle(&request_id, client_id, e.retry_after().unwrap_or(0));
                return Err(e);
            }
        }

        let language = request
            .language
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_else(|| self.default_language.clone());

        TracingService::log_request_accepted(
            &request_id,
            request.image.bytes.len(),
            request.image.format.as_str(),
            &language,
            request.level.as_str(),
            request.region.is_some(),
        );

        let _token = self.concurrency.acquire().await?;

        let (prepared, image_sha256) = self.prepare_image(&request).await?;

        let options = EngineOptions {
            language: language.clone(),
            page_segmentation_mode: self.page_segmentation_mode,
        };
        let engine_started = Instant::now();
        let words = tokio::time::timeout(self.timeout, self.engine.recognize(&prepared.png, &options))
            .await
            .map_err(|_| OcrError::EngineTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })??;
        let engine_duration = engine_started.elapsed();
        self.metrics.record_engine_duration(millis(engine_duration));

        let layout = assemble(&words, request.level, prepared.origin);
        let duration = started.elapsed();

        TracingService::log_ocr_completed(
            &request_id,
            duration.as_millis() as u64,
            engine_duration.as_millis() as u64,
            layout.blocks.len(),
            layout.text.chars().count(),
            layout.confidence,
        );

        Ok(OcrResult {
            request_id: request.request_id,
            text: layout.text,
            confidence: layout.confidence,
            blocks: layout.blocks,
            language,
            width: prepared.width,
            height: prepared.height,
            image_sha256,
            duration,
            engine_duration,
            completed_at: Utc::now(),
        })
    }

    /// Decoding and hashing run on the blocking pool.
    async fn prepare_image(&self, request: &OcrRequest) -> Result<(PreparedImage, String), OcrError> {
        let bytes = request.image.bytes.clone();
        let format = request.image.format;
        let region = request.region;
        let limits = self.limits;

        tokio::task::spawn_blocking(move || {
            let digest = format!("{:x}", Sha256::digest(&bytes));
            prepare(&bytes, format, region, &limits).map(|prepared| (prepared, digest))
        })
        .await
        .map_err(|e| OcrError::InternalError {
            reason: format!("image preparation task failed: {e}"),
        })?
    }
}
