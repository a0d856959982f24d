use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use ocr_models::{ErrorShape, OcrError, OcrResponse, OcrResult, TextBlockResponse};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub type ErrorResponse = (StatusCode, HeaderMap, Json<ErrorShape>);

/// Confidences are reported with four decimals.
pub fn round_confidence(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

pub fn format_result(result: &OcrResult) -> OcrResponse {
    OcrResponse {
        request_id: result.request_id,
        text: result.text.clone(),
        confidence: round_confidence(result.confidence),
        blocks: result
            .blocks
            .iter()
            .map(|block| TextBlockResponse {
                text: block.text.clone(),
                confidence: round_confidence(block.confidence),
                level: block.level,
                bbox: block.bbox,
            })
            .collect(),
        language: result.language.clone(),
        width: result.width,
        height: result.height,
        image_sha256: result.image_sha256.clone(),
        duration_ms: result.duration.as_millis() as u64,
        completed_at: result.completed_at,
    }
}

pub fn request_id_headers(request_id: Uuid) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    headers
}

pub fn error_response(error: &OcrError, request_id: Option<Uuid>) -> ErrorResponse {
    let mut shape = error.to_error_shape();
    shape.request_id = request_id.map(|id| id.to_string());

    let mut headers = request_id.map(request_id_headers).unwrap_or_default();
    if let Some(secs) = error.retry_after() {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }

    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, headers, Json(shape))
}
