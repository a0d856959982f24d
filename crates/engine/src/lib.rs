pub mod layout;
pub mod preprocess;
pub mod tesseract;
pub mod tsv;

pub use layout::*;
pub use preprocess::*;
pub use tesseract::*;
pub use tsv::*;

use async_trait::async_trait;
use ocr_models::OcrError;

/// Per-call knobs passed to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub language: String,
    pub page_segmentation_mode: u8,
}

/// Anything that can turn a PNG into recognized words.
#[async_trait]
pub trait OcrEngine: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// `png` is always a PNG produced by [`prepare`].
    async fn recognize(
        &self,
        png: &[u8],
        options: &EngineOptions,
    ) -> Result<Vec<RecognizedWord>, OcrError>;

    async fn languages(&self) -> Result<Vec<String>, OcrError>;
}
