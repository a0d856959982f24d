//! OCR@Home: tesseract-backed OCR over HTTP.
//!
//! The server binary lives in `src/bin/ocr-at-home-server.rs`; the pieces it
//! wires together are re-exported here.

pub use ocr_api as api;
pub use ocr_control as control;
pub use ocr_engine as engine;
pub use ocr_metrics as metrics;
pub use ocr_models as models;

use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "configs/default.toml";

/// `OCR_CONFIG` if set, otherwise `configs/default.toml`.
pub fn config_path() -> PathBuf {
    std::env::var_os("OCR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
