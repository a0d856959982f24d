use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorShape {
    pub error_type: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Coarse failure class, used for status mapping and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Throttled,
    OcrEngine,
    Internal,
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Image payload is empty")]
    EmptyPayload,

    #[error("Unsupported image format: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("Image could not be decoded: {reason}")]
    CorruptImage { reason: String },

    #[error("Image too large: {width}x{height} (max dimension {max_dimension}, max pixels {max_pixels})")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
        max_pixels: u64,
    },

    #[error("Invalid language hint: {language}")]
    InvalidLanguage { language: String },

    #[error("Invalid region: {reason}")]
    InvalidRegion { reason: String },

    #[error("Invalid block level: {level}")]
    InvalidLevel { level: String },

    #[error("Request body exceeds the {limit_bytes} byte limit")]
    PayloadTooLarge { limit_bytes: usize },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Failed to fetch image from {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Too many requests, retry in {retry_after_secs}s")]
    CooldownActive { retry_after_secs: u64 },

    #[error("OCR engine failed: {reason}")]
    EngineFailure { reason: String },

    #[error("OCR language pack not installed: {language}")]
    MissingLanguage { language: String },

    #[error("OCR engine timed out after {timeout_ms}ms")]
    EngineTimeout { timeout_ms: u64 },

    #[error("OCR engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("Internal server error: {reason}")]
    InternalError { reason: String },

    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::EmptyPayload
            | OcrError::UnsupportedFormat { .. }
            | OcrError::CorruptImage { .. }
            | OcrError::ImageTooLarge { .. }
            | OcrError::InvalidLanguage { .. }
            | OcrError::InvalidRegion { .. }
            | OcrError::InvalidLevel { .. }
            | OcrError::PayloadTooLarge { .. }
            | OcrError::InvalidRequest { .. }
            | OcrError::FetchFailed { .. } => ErrorKind::Validation,
            OcrError::CooldownActive { .. } => ErrorKind::Throttled,
            OcrError::EngineFailure { .. }
            | OcrError::MissingLanguage { .. }
            | OcrError::EngineTimeout { .. }
            | OcrError::EngineUnavailable { .. } => ErrorKind::OcrEngine,
            OcrError::InternalError { .. } | OcrError::ConfigError { .. } => ErrorKind::Internal,
        }
    }

    pub fn to_error_shape(&self) -> ErrorShape {
        ErrorShape {
            error_type: self.error_type().to_string(),
            error_message: self.to_string(),
            request_id: None,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Throttled => "TooManyRequests",
            ErrorKind::OcrEngine => "OcrEngineError",
            ErrorKind::Internal => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            OcrError::PayloadTooLarge { .. } => 413,
            OcrError::CooldownActive { .. } => 429,
            OcrError::EngineFailure { .. } => 502,
            OcrError::MissingLanguage { .. } => 502,
            OcrError::EngineTimeout { .. } => 504,
            OcrError::EngineUnavailable { .. } => 500,
            OcrError::InternalError { .. } => 500,
            OcrError::ConfigError { .. } => 500,
            _ => 400,
        }
    }

    /// Seconds a throttled client should wait, when applicable.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            OcrError::CooldownActive { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}
