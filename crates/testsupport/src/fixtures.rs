//! In-memory images for tests. Nothing here touches the filesystem.

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use ocr_engine::RecognizedWord;
use ocr_models::BoundingBox;
use std::io::Cursor;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const SCALE: u32 = 8;
const MARGIN: u32 = 32;

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture image");
    out.into_inner()
}

/// Plain white PNG.
pub fn blank_png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([255]))),
        ImageFormat::Png,
    )
}

/// Plain white JPEG.
pub fn blank_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))),
        ImageFormat::Jpeg,
    )
}

/// A PNG cut off halfway through; the header survives, the pixel data does not.
pub fn truncated_png() -> Vec<u8> {
    let full = text_png("HELLO");
    full[..full.len() / 2].to_vec()
}

pub fn not_an_image() -> Vec<u8> {
    b"this is definitely not an image, just some plain text".to_vec()
}

fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        _ => [0; 7],
    }
}

/// Renders `text` in a blocky 5x7 font, black on white. Only the letters of
/// HELLO, WORLD, OCR and TEST are drawn; anything else becomes a gap.
pub fn text_png(text: &str) -> Vec<u8> {
    let cell = (GLYPH_WIDTH + 1) * SCALE;
    let chars: Vec<char> = text.chars().collect();
    let width = MARGIN * 2 + cell * chars.len().max(1) as u32;
    let height = MARGIN * 2 + GLYPH_HEIGHT * SCALE;

    let mut img = GrayImage::from_pixel(width, height, Luma([255]));
    for (i, c) in chars.iter().enumerate() {
        let rows = glyph(*c);
        let origin_x = MARGIN + cell * i as u32;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..SCALE {
                    for dx in 0..SCALE {
                        let x = origin_x + col * SCALE + dx;
                        let y = MARGIN + row as u32 * SCALE + dy;
                        img.put_pixel(x, y, Luma([0]));
                    }
                }
            }
        }
    }
    encode(DynamicImage::ImageLuma8(img), ImageFormat::Png)
}

/// A word on `line` of the first paragraph, laid out left to right.
pub fn word(text: &str, line: u32, word_num: u32, confidence: f64) -> RecognizedWord {
    RecognizedWord {
        block_num: 1,
        par_num: 1,
        line_num: line,
        word_num,
        bbox: BoundingBox {
            x: 10 + (word_num.saturating_sub(1)) * 60,
            y: 10 + (line.saturating_sub(1)) * 30,
            width: 50,
            height: 20,
        },
        confidence,
        text: text.to_string(),
    }
}

/// Splits `text` on whitespace into words of a single line.
pub fn line_of(text: &str, line: u32, confidence: f64) -> Vec<RecognizedWord> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| word(w, line, i as u32 + 1, confidence))
        .collect()
}
