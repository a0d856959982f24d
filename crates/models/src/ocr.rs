use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::OcrError;

const MAX_LANGUAGE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Webp,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw uploaded bytes plus the format sniffed from their magic number.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub format: ImageFormat,
}

/// Tesseract language spec, e.g. `eng` or `eng+deu`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LanguageHint(String);

impl LanguageHint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LanguageHint {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = !s.is_empty()
            && s.len() <= MAX_LANGUAGE_LEN
            && s.split('+').all(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            });
        if !valid {
            return Err(OcrError::InvalidLanguage {
                language: s.to_string(),
            });
        }
        Ok(LanguageHint(s.to_string()))
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Region of interest in source-image pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Checks the region is non-empty and fully inside a `width` x `height` image.
    pub fn check_within(&self, width: u32, height: u32) -> Result<(), OcrError> {
        if self.width == 0 || self.height == 0 {
            return Err(OcrError::InvalidRegion {
                reason: "width and height must be positive".to_string(),
            });
        }
        let right = self.x as u64 + self.width as u64;
        let bottom = self.y as u64 + self.height as u64;
        if right > width as u64 || bottom > height as u64 {
            return Err(OcrError::InvalidRegion {
                reason: format!(
                    "{},{},{},{} exceeds image bounds {}x{}",
                    self.x, self.y, self.width, self.height, width, height
                ),
            });
        }
        Ok(())
    }
}

impl FromStr for Region {
    type Err = OcrError;

    /// Parses `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let invalid = || OcrError::InvalidRegion {
            reason: format!("expected x,y,width,height but got '{s}'"),
        };
        if parts.len() != 4 {
            return Err(invalid());
        }
        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Region {
            x: values[0],
            y: values[1],
            width: values[2],
            height: values[3],
        })
    }
}

/// Granularity at which recognized words are grouped into blocks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BlockLevel {
    Word,
    #[default]
    Line,
    Paragraph,
    Block,
}

impl BlockLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockLevel::Word => "word",
            BlockLevel::Line => "line",
            BlockLevel::Paragraph => "paragraph",
            BlockLevel::Block => "block",
        }
    }
}

impl FromStr for BlockLevel {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" => Ok(BlockLevel::Word),
            "line" => Ok(BlockLevel::Line),
            "paragraph" | "par" => Ok(BlockLevel::Paragraph),
            "block" => Ok(BlockLevel::Block),
            _ => Err(OcrError::InvalidLevel {
                level: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub request_id: Uuid,
    pub image: ImagePayload,
    pub language: Option<LanguageHint>,
    pub region: Option<Region>,
    pub level: BlockLevel,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    pub fn translate(&self, dx: u32, dy: u32) -> BoundingBox {
        BoundingBox {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    /// In [0,1].
    pub confidence: f64,
    pub level: BlockLevel,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct OcrResult {
    pub request_id: Uuid,
    pub text: String,
    pub confidence: f64,
    pub blocks: Vec<TextBlock>,
    pub language: String,
    pub width: u32,
    pub height: u32,
    pub image_sha256: String,
    pub duration: Duration,
    pub engine_duration: Duration,
    pub completed_at: DateTime<Utc>,
}

// Wire types

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TextBlockResponse {
    pub text: String,
    pub confidence: f64,
    pub level: BlockLevel,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OcrResponse {
    pub request_id: Uuid,
    pub text: String,
    pub confidence: f64,
    pub blocks: Vec<TextBlockResponse>,
    pub language: String,
    pub width: u32,
    pub height: u32,
    pub image_sha256: String,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// JSON form of `POST /ocr`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OcrJsonRequest {
    pub image_base64: Option<String>,
    pub image_url: Option<String>,
    pub language: Option<String>,
    pub region: Option<Region>,
    pub level: Option<String>,
}

/// Query-string options for raw-body uploads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OcrQuery {
    pub language: Option<String>,
    pub region: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LanguagesResponse {
    pub languages: Vec<String>,
}
