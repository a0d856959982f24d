//! Turns an incoming `POST /ocr` into a validated [`OcrRequest`].
//!
//! Three body shapes are accepted: multipart forms, JSON documents carrying
//! base64 data or a URL, and raw image bodies with options in the query
//! string. Everything that can be checked without decoding the image is
//! checked here; decoding happens in the executor.

use axum::extract::{FromRequest, Multipart, Query, Request};
use axum::http::{header, HeaderMap, StatusCode};
use base64::Engine;
use bytes::{Bytes, BytesMut};
use ocr_engine::sniff_format;
use ocr_models::{
    BlockLevel, ImagePayload, LanguageHint, OcrError, OcrJsonRequest, OcrQuery, OcrRequest, Region,
};
use tracing::debug;
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Multipart,
    Json,
    Raw,
}

/// Picks the body shape from the `Content-Type` header.
pub fn body_kind(headers: &HeaderMap) -> Result<BodyKind, OcrError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(BodyKind::Raw);
    };
    let content_type = value
        .to_str()
        .map_err(|_| OcrError::InvalidRequest {
            reason: "Content-Type header is not valid text".to_string(),
        })?
        .to_ascii_lowercase();
    let mime = content_type.split(';').next().unwrap_or_default().trim();

    match mime {
        "multipart/form-data" => Ok(BodyKind::Multipart),
        "application/json" => Ok(BodyKind::Json),
        m if m.ends_with("+json") => Ok(BodyKind::Json),
        "" | "application/octet-stream" => Ok(BodyKind::Raw),
        m if m.starts_with("image/") => Ok(BodyKind::Raw),
        other => Err(OcrError::UnsupportedFormat {
            reason: format!("content type {other} is not an image"),
        }),
    }
}

#[derive(Debug, Default)]
enum RegionInput {
    #[default]
    Absent,
    Text(String),
    Object(Region),
}

/// Options as they arrived, before parsing.
#[derive(Debug, Default)]
struct RawOptions {
    language: Option<String>,
    region: RegionInput,
    level: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn rejection_error(status: StatusCode, body_limit: usize, message: String) -> OcrError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::PayloadTooLarge {
            limit_bytes: body_limit,
        }
    } else {
        OcrError::InvalidRequest { reason: message }
    }
}

/// Reads and validates the request body. Does not decode the image.
pub async fn read_request(
    state: &AppState,
    request_id: Uuid,
    request: Request,
) -> Result<OcrRequest, OcrError> {
    let kind = body_kind(request.headers())?;
    let client_id = client_id(request.headers(), &state.config.cooldown.client_header);
    let body_limit = state.config.max_request_body_bytes();

    let (image, options) = match kind {
        BodyKind::Multipart => read_multipart(request, body_limit).await?,
        BodyKind::Json => read_json(state, request, body_limit).await?,
        BodyKind::Raw => read_raw(request, body_limit).await?,
    };
    debug!(?kind, bytes = image.len(), "Read OCR request body");

    build_request(request_id, image, options, client_id)
}

fn client_id(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn read_multipart(request: Request, body_limit: usize) -> Result<(Bytes, RawOptions), OcrError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| OcrError::InvalidRequest {
            reason: e.body_text(),
        })?;

    let mut image = None;
    let mut options = RawOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejection_error(e.status(), body_limit, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "file" if image.is_none() => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| rejection_error(e.status(), body_limit, e.body_text()))?;
                image = Some(bytes);
            }
            "language" | "region" | "level" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| rejection_error(e.status(), body_limit, e.body_text()))?;
                match name.as_str() {
                    "language" => options.language = non_blank(Some(value)),
                    "region" => {
                        if let Some(text) = non_blank(Some(value)) {
                            options.region = RegionInput::Text(text);
                        }
                    }
                    _ => options.level = non_blank(Some(value)),
                }
            }
            _ => debug!("Ignoring multipart field {:?}", name),
        }
    }

    let image = image.ok_or_else(|| OcrError::InvalidRequest {
        reason: "multipart body has no `image` or `file` part".to_string(),
    })?;
    Ok((image, options))
}

async fn read_json(
    state: &AppState,
    request: Request,
    body_limit: usize,
) -> Result<(Bytes, RawOptions), OcrError> {
    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| rejection_error(e.status(), body_limit, e.body_text()))?;
    let payload: OcrJsonRequest = serde_json::from_slice(&body).map_err(|e| OcrError::InvalidRequest {
        reason: format!("invalid JSON body: {e}"),
    })?;

    let image = match (payload.image_base64, payload.image_url) {
        (Some(data), None) => decode_base64(&data)?,
        (None, Some(url)) => fetch_image(state, &url, body_limit).await?,
        (Some(_), Some(_)) => {
            return Err(OcrError::InvalidRequest {
                reason: "provide only one of image_base64 or image_url".to_string(),
            })
        }
        (None, None) => {
            return Err(OcrError::InvalidRequest {
                reason: "one of image_base64 or image_url is required".to_string(),
            })
        }
    };

    let options = RawOptions {
        language: non_blank(payload.language),
        region: payload.region.map_or(RegionInput::Absent, RegionInput::Object),
        level: non_blank(payload.level),
    };
    Ok((image, options))
}

async fn read_raw(request: Request, body_limit: usize) -> Result<(Bytes, RawOptions), OcrError> {
    let Query(query) = Query::<OcrQuery>::try_from_uri(request.uri()).map_err(|e| {
        OcrError::InvalidRequest {
            reason: e.body_text(),
        }
    })?;
    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| rejection_error(e.status(), body_limit, e.body_text()))?;

    let options = RawOptions {
        language: non_blank(query.language),
        region: non_blank(query.region).map_or(RegionInput::Absent, RegionInput::Text),
        level: non_blank(query.level),
    };
    Ok((body, options))
}

/// Standard base64, optionally wrapped in a `data:` URL.
pub fn decode_base64(data: &str) -> Result<Bytes, OcrError> {
    let data = data.trim();
    let encoded = match data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, b)| b).unwrap_or_default(),
        None => data,
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map(Bytes::from)
        .map_err(|e| OcrError::InvalidRequest {
            reason: format!("image_base64 is not valid base64: {e}"),
        })
}

async fn fetch_image(state: &AppState, url: &str, body_limit: usize) -> Result<Bytes, OcrError> {
    if !state.config.fetch.enabled {
        return Err(OcrError::InvalidRequest {
            reason: "image_url is disabled on this server".to_string(),
        });
    }
    let parsed = reqwest::Url::parse(url).map_err(|e| OcrError::InvalidRequest {
        reason: format!("image_url is not a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(OcrError::InvalidRequest {
            reason: format!("image_url scheme {} is not supported", parsed.scheme()),
        });
    }

    let fetch_failed = |reason: String| OcrError::FetchFailed {
        url: url.to_string(),
        reason,
    };

    let mut response = state
        .http
        .get(parsed)
        .send()
        .await
        .map_err(|e| fetch_failed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fetch_failed(format!("upstream returned {}", response.status())));
    }
    if response.content_length().is_some_and(|len| len > body_limit as u64) {
        return Err(OcrError::PayloadTooLarge {
            limit_bytes: body_limit,
        });
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| fetch_failed(e.to_string()))? {
        if body.len() + chunk.len() > body_limit {
            return Err(OcrError::PayloadTooLarge {
                limit_bytes: body_limit,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn build_request(
    request_id: Uuid,
    image: Bytes,
    options: RawOptions,
    client_id: Option<String>,
) -> Result<OcrRequest, OcrError> {
    if image.is_empty() {
        return Err(OcrError::EmptyPayload);
    }
    let format = sniff_format(&image)?;

    let language = options
        .language
        .map(|l| l.parse::<LanguageHint>())
        .transpose()?;
    let region = match options.region {
        RegionInput::Absent => None,
        RegionInput::Text(text) => Some(text.parse::<Region>()?),
        RegionInput::Object(region) => Some(region),
    };
    let level = options
        .level
        .map(|l| l.parse::<BlockLevel>())
        .transpose()?
        .unwrap_or_default();

    Ok(OcrRequest {
        request_id,
        image: ImagePayload {
            bytes: image,
            format,
        },
        language,
        region,
        level,
        client_id,
    })
}
