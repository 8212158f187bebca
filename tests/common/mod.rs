//! Test-only encoder: writes `signature + length(bits, BE) + payload` into
//! alpha LSBs, column by column.

#![allow(dead_code)]

use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use stealth_pnginfo::formats::header::{byte_bits, signature_bits};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn stealth_bits(payload: &[u8]) -> Vec<u8> {
    let mut bits = signature_bits();
    let param_len = (payload.len() * 8) as u32;
    bits.extend(param_len.to_be_bytes().iter().flat_map(|&b| byte_bits(b)));
    bits.extend(payload.iter().flat_map(|&b| byte_bits(b)));
    bits
}

pub fn embed_bits(bits: &[u8], width: u32, height: u32) -> RgbaImage {
    assert!(bits.len() <= (width * height) as usize, "fixture image too small");
    ImageBuffer::from_fn(width, height, |x, y| {
        let idx = (x * height + y) as usize;
        let alpha = match bits.get(idx) {
            Some(&bit) => 0xFE | bit,
            None => 0xFF,
        };
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, alpha])
    })
}

/// Smallest square-ish image that fits `text`.
pub fn embed(text: &str) -> DynamicImage {
    let bits = stealth_bits(text.as_bytes());
    let height = 16u32;
    let width = (bits.len() as u32).div_ceil(height).max(1);
    DynamicImage::ImageRgba8(embed_bits(&bits, width, height))
}

pub fn encode_png(image: &RgbaImage, parameters: Option<&str>) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(text) = parameters {
            encoder
                .add_text_chunk("parameters".to_string(), text.to_string())
                .unwrap();
        }
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(image.as_raw()).unwrap();
    }
    out
}
