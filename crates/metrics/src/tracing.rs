use ocr_models::{LogFormat, LoggingConfig, OcrError};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

pub struct TracingService;

impl TracingService {
    /// `RUST_LOG` wins over the configured filter.
    pub fn init(config: &LoggingConfig) -> Result<(), OcrError> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.filter))
            .map_err(|e| OcrError::ConfigError {
                reason: format!("invalid log filter '{}': {}", config.filter, e),
            })?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339());

        let result = match config.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Text => builder.try_init(),
        };
        result.map_err(|e| OcrError::ConfigError {
            reason: e.to_string(),
        })
    }

    pub fn log_request_accepted(
        request_id: &str,
        bytes: usize,
        format: &str,
        language: &str,
        level: &str,
        has_region: bool,
    ) {
        info!(
            request_id = %request_id,
            bytes = bytes,
            format = %format,
            language = %language,
            level = %level,
            has_region = has_region,
            "OCR request accepted"
        );
    }

    pub fn log_ocr_completed(
        request_id: &str,
        duration_ms: u64,
        engine_ms: u64,
        blocks: usize,
        chars: usize,
        confidence: f64,
    ) {
        info!(
            request_id = %request_id,
            duration_ms = duration_ms,
            engine_ms = engine_ms,
            blocks = blocks,
            chars = chars,
            confidence = confidence,
            "OCR completed"
        );
    }

    pub fn log_ocr_failed(request_id: &str, error_type: &str, status: u16, error_message: &str) {
        if status >= 500 {
            error!(
                request_id = %request_id,
                error_type = %error_type,
                status = status,
                error_message = %error_message,
                "OCR failed"
            );
        } else {
            warn!(
                request_id = %request_id,
                error_type = %error_type,
                status = status,
                error_message = %error_message,
                "OCR rejected"
            );
        }
    }

    pub fn log_throttle(request_id: &str, client_id: &str, retry_after_secs: u64) {
        warn!(
            request_id = %request_id,
            client_id = %client_id,
            retry_after_secs = retry_after_secs,
            "Request throttled"
        );
    }
}
