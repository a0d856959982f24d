use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use ocr_metrics::TracingService;
use ocr_models::{ErrorKind, ErrorShape, LanguagesResponse, OcrError, OcrResponse};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::intake::read_request;
use crate::response::{error_response, format_result, request_id_headers, ErrorResponse};
use crate::AppState;

pub const ROOT_BANNER: &str = "OCR@Home is running. POST an image to /ocr.";

pub async fn root() -> &'static str {
    ROOT_BANNER
}

#[instrument(skip(state, request))]
async fn handle_ocr(
    state: &AppState,
    request_id: Uuid,
    request: Request,
) -> Result<OcrResponse, ErrorResponse> {
    let outcome = match read_request(state, request_id, request).await {
        Ok(ocr_request) => state.executor.execute(ocr_request).await,
        Err(e) => Err(e),
    };

    outcome.map(|result| format_result(&result)).map_err(|e| {
        state.metrics.record_error(e.error_type());
        log_failure(request_id, &e);
        error_response(&e, Some(request_id))
    })
}

/// Logs a failed request once. Throttles are already logged by the executor,
/// which knows the client id; returns whether a line was written here.
fn log_failure(request_id: Uuid, e: &OcrError) -> bool {
    if e.kind() == ErrorKind::Throttled {
        return false;
    }
    TracingService::log_ocr_failed(
        &request_id.to_string(),
        e.error_type(),
        e.http_status(),
        &e.to_string(),
    );
    true
}

pub async fn ocr(
    State(state): State<AppState>,
    request: Request,
) -> Result<(HeaderMap, Json<OcrResponse>), ErrorResponse> {
    let request_id = Uuid::new_v4();
    state.metrics.record_request();

    let response = handle_ocr(&state, request_id, request).await?;
    Ok((request_id_headers(request_id), Json(response)))
}

#[instrument(skip(state))]
pub async fn languages(
    State(state): State<AppState>,
) -> Result<Json<LanguagesResponse>, (StatusCode, Json<ErrorShape>)> {
    match state.executor.engine().languages().await {
        Ok(languages) => {
            info!("Engine reports {} languages", languages.len());
            Ok(Json(LanguagesResponse { languages }))
        }
        Err(e) => {
            error!("Failed to list languages: {}", e);
            let error_shape = e.to_error_shape();
            Err((
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(error_shape),
            ))
        }
    }
}

#[instrument(skip(_state))]
pub async fn health_check(
    State(_state): State<AppState>,
) -> Result<&'static str, StatusCode> {
    Ok("OK")
}

#[instrument(skip(state))]
pub async fn metrics(
    State(state): State<AppState>,
) -> Result<String, StatusCode> {
    match state.metrics.get_prometheus_metrics() {
        Ok(metrics) => Ok(metrics),
        Err(e) => {
            error!("Failed to get metrics: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
