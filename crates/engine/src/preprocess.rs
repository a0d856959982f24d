use image::{ColorType, DynamicImage, GenericImageView, ImageReader, Limits, Rgb, RgbImage};
use ocr_models::{ImageFormat, LimitsConfig, OcrError, Region};
use std::io::Cursor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_dimension: u32,
    pub max_pixels: u64,
}

impl From<&LimitsConfig> for ImageLimits {
    fn from(limits: &LimitsConfig) -> Self {
        Self {
            max_dimension: limits.max_image_dimension,
            max_pixels: limits.max_image_pixels,
        }
    }
}

/// Decoded, cropped and re-encoded image ready for the engine.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub png: Vec<u8>,
    /// Dimensions of the source image, before cropping.
    pub width: u32,
    pub height: u32,
    /// Top-left corner of the crop in source coordinates.
    pub origin: (u32, u32),
}

fn to_codec_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Bmp => image::ImageFormat::Bmp,
        ImageFormat::Tiff => image::ImageFormat::Tiff,
        ImageFormat::Webp => image::ImageFormat::WebP,
    }
}

/// Identifies the payload format from its magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::EmptyPayload);
    }
    let guessed = image::guess_format(bytes).map_err(|_| OcrError::UnsupportedFormat {
        reason: "payload is not a recognized image".to_string(),
    })?;
    match guessed {
        image::ImageFormat::Png => Ok(ImageFormat::Png),
        image::ImageFormat::Jpeg => Ok(ImageFormat::Jpeg),
        image::ImageFormat::Gif => Ok(ImageFormat::Gif),
        image::ImageFormat::Bmp => Ok(ImageFormat::Bmp),
        image::ImageFormat::Tiff => Ok(ImageFormat::Tiff),
        image::ImageFormat::WebP => Ok(ImageFormat::Webp),
        other => Err(OcrError::UnsupportedFormat {
            reason: format!("{other:?} images are not supported"),
        }),
    }
}

fn corrupt(e: image::ImageError) -> OcrError {
    OcrError::CorruptImage {
        reason: e.to_string(),
    }
}

/// Reads only the header and enforces the configured size limits.
pub fn check_dimensions(
    bytes: &[u8],
    format: ImageFormat,
    limits: &ImageLimits,
) -> Result<(u32, u32), OcrError> {
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), to_codec_format(format))
        .into_dimensions()
        .map_err(corrupt)?;
    if width == 0 || height == 0 {
        return Err(OcrError::CorruptImage {
            reason: format!("image has zero size ({width}x{height})"),
        });
    }
    if width > limits.max_dimension
        || height > limits.max_dimension
        || width as u64 * height as u64 > limits.max_pixels
    {
        return Err(OcrError::ImageTooLarge {
            width,
            height,
            max_dimension: limits.max_dimension,
            max_pixels: limits.max_pixels,
        });
    }
    Ok((width, height))
}

/// Fully decodes the payload; truncated or corrupt data fails here.
pub fn decode(bytes: &[u8], format: ImageFormat, limits: &ImageLimits) -> Result<DynamicImage, OcrError> {
    let mut decoder_limits = Limits::default();
    decoder_limits.max_image_width = Some(limits.max_dimension);
    decoder_limits.max_image_height = Some(limits.max_dimension);

    let mut reader = ImageReader::with_format(Cursor::new(bytes), to_codec_format(format));
    reader.limits(decoder_limits);
    reader.decode().map_err(corrupt)
}

// Transparent pixels would otherwise read as black to the engine.
fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(out)
}

// PNG has no float samples; 32-bit float TIFFs land here.
fn to_png_color(img: DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => img,
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| OcrError::InternalError {
            reason: format!("failed to encode PNG: {e}"),
        })?;
    Ok(png)
}

/// Validates, decodes, crops to `region` and re-encodes as PNG. CPU bound;
/// callers run it on a blocking thread.
pub fn prepare(
    bytes: &[u8],
    format: ImageFormat,
    region: Option<Region>,
    limits: &ImageLimits,
) -> Result<PreparedImage, OcrError> {
    let (width, height) = check_dimensions(bytes, format, limits)?;
    if let Some(region) = region {
        region.check_within(width, height)?;
    }

    let img = decode(bytes, format, limits)?;
    debug_assert_eq!(img.dimensions(), (width, height));

    let (img, origin) = match region {
        Some(r) => (img.crop_imm(r.x, r.y, r.width, r.height), (r.x, r.y)),
        None => (img, (0, 0)),
    };

    let png = encode_png(&to_png_color(flatten_alpha(img)))?;
    Ok(PreparedImage {
        png,
        width,
        height,
        origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb32FImage, Rgba, RgbaImage};

    fn limits() -> ImageLimits {
        ImageLimits {
            max_dimension: 1000,
            max_pixels: 100_000,
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::GrayImage::from_pixel(width, height, Luma([255u8]));
        encode_png(&DynamicImage::ImageLuma8(img)).unwrap()
    }

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(sniff_format(&png(2, 2)).unwrap(), ImageFormat::Png);
        assert_eq!(
            sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).unwrap(),
            ImageFormat::Jpeg
        );
        assert!(matches!(sniff_format(&[]), Err(OcrError::EmptyPayload)));
        assert!(matches!(
            sniff_format(b"hello world, not an image"),
            Err(OcrError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn prepares_whole_image() {
        let prepared = prepare(&png(40, 20), ImageFormat::Png, None, &limits()).unwrap();
        assert_eq!((prepared.width, prepared.height), (40, 20));
        assert_eq!(prepared.origin, (0, 0));
        assert_eq!(sniff_format(&prepared.png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn crops_to_region() {
        let region = Region {
            x: 5,
            y: 4,
            width: 10,
            height: 8,
        };
        let prepared = prepare(&png(40, 20), ImageFormat::Png, Some(region), &limits()).unwrap();
        assert_eq!((prepared.width, prepared.height), (40, 20));
        assert_eq!(prepared.origin, (5, 4));
        let cropped = image::load_from_memory(&prepared.png).unwrap();
        assert_eq!(cropped.dimensions(), (10, 8));
    }

    #[test]
    fn region_outside_image_is_rejected() {
        let region = Region {
            x: 35,
            y: 0,
            width: 10,
            height: 5,
        };
        let err = prepare(&png(40, 20), ImageFormat::Png, Some(region), &limits()).unwrap_err();
        assert!(matches!(err, OcrError::InvalidRegion { .. }));
    }

    #[test]
    fn truncated_png_is_corrupt() {
        let full = png(64, 64);
        let truncated = &full[..full.len() / 2];
        let err = prepare(truncated, ImageFormat::Png, None, &limits()).unwrap_err();
        assert!(matches!(err, OcrError::CorruptImage { .. }), "{err:?}");
    }

    #[test]
    fn oversized_images_are_rejected_before_decoding() {
        let err = prepare(&png(500, 500), ImageFormat::Png, None, &limits()).unwrap_err();
        assert!(matches!(err, OcrError::ImageTooLarge { .. }));
        let err = prepare(&png(1001, 1), ImageFormat::Png, None, &limits()).unwrap_err();
        assert!(matches!(err, OcrError::ImageTooLarge { .. }));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let flat = flatten_alpha(DynamicImage::ImageRgba8(img)).to_rgb8();
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn float_tiff_is_reencoded_as_8_bit_png() {
        let img = Rgb32FImage::from_pixel(16, 16, Rgb([1.0, 1.0, 1.0]));
        let mut tiff = Vec::new();
        DynamicImage::ImageRgb32F(img)
            .write_to(&mut Cursor::new(&mut tiff), image::ImageFormat::Tiff)
            .unwrap();
        assert_eq!(sniff_format(&tiff).unwrap(), ImageFormat::Tiff);

        let prepared = prepare(&tiff, ImageFormat::Tiff, None, &limits()).unwrap();
        assert_eq!((prepared.width, prepared.height), (16, 16));
        let decoded = image::load_from_memory(&prepared.png).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert_eq!(decoded.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    }
}
