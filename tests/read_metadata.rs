mod common;

use common::{embed_bits, encode_png, init_logging, stealth_bits};
use image::{DynamicImage, ImageBuffer, ImageFormat, ImageOutputFormat, Rgba};
use std::io::Cursor;
use stealth_pnginfo::formats::document::{export_document, render_lines};
use stealth_pnginfo::{ImageIntrinsics, MetadataReader};

const PARAMS: &str = "cat, Negative prompt: dog, Steps: 20, Sampler: Euler";

fn stealth_image(text: &str) -> image::RgbaImage {
    embed_bits(&stealth_bits(text.as_bytes()), 40, 16)
}

#[test]
fn test_stealth_png_bytes() {
    init_logging();
    let png = encode_png(&stealth_image(PARAMS), None);
    let record = MetadataReader::default().read_bytes(&png, "00042-99.png").unwrap();

    assert_eq!(
        record.fields.iter().collect::<Vec<_>>(),
        vec![
            ("Prompt", "cat, "),
            ("Negative Prompt", "dog, "),
            ("Steps", "20"),
            ("Sampler", "Euler"),
            ("Filename", "00042-99.png"),
            ("Size", "0.0 MB"),
            ("Dimensions", "40x16"),
            ("Format", "PNG"),
            ("Mode", "RGBA"),
        ]
    );
}

#[test]
fn test_text_chunk_wins_over_stealth() {
    let png = encode_png(&stealth_image(PARAMS), Some("bird\nSteps: 30, Seed: 5"));
    let record = MetadataReader::default().read_bytes(&png, "chunk.png").unwrap();
    assert_eq!(record.get("Prompt"), Some("bird\n"));
    assert_eq!(record.get("Seed"), Some("5"));
    assert_eq!(record.get("Sampler"), None);
}

#[test]
fn test_text_chunks_can_be_skipped() {
    let png = encode_png(&stealth_image(PARAMS), Some("bird\nSteps: 30"));
    let reader = MetadataReader { read_text_chunks: false, ..MetadataReader::default() };
    let record = reader.read_bytes(&png, "chunk.png").unwrap();
    assert_eq!(record.get("Prompt"), Some("cat, "));
}

#[test]
fn test_empty_chunk_falls_back_to_stealth() {
    let png = encode_png(&stealth_image(PARAMS), Some(""));
    let record = MetadataReader::default().read_bytes(&png, "x.png").unwrap();
    assert_eq!(record.get("Sampler"), Some("Euler"));
}

#[test]
fn test_non_png_bytes_use_stealth_scan() {
    let image = DynamicImage::ImageRgba8(stealth_image("bmp Steps: 4"));
    let mut bmp = Vec::new();
    image.write_to(&mut Cursor::new(&mut bmp), ImageOutputFormat::Bmp).unwrap();

    let record = MetadataReader::default().read_bytes(&bmp, "hidden.bmp").unwrap();
    assert_eq!(record.get("Prompt"), Some("bmp "));
    assert_eq!(record.get("Steps"), Some("4"));
    assert_eq!(record.get("Dimensions"), Some("40x16"));
    assert_eq!(record.get("Format"), Some("BMP"));
}

#[test]
fn test_parameter_section_cannot_replace_prompt() {
    let image = DynamicImage::ImageRgba8(stealth_image("cat Steps: 1, Prompt: hijack"));
    let info = ImageIntrinsics::from_image(&image, "h.png", 10, Some(ImageFormat::Png));
    let record = MetadataReader::default().read_image(&image, &info);
    assert_eq!(record.get("Prompt"), Some("cat "));
    assert_eq!(record.fields.keys().take(2).collect::<Vec<_>>(), vec!["Prompt", "Steps"]);
}

#[test]
fn test_plain_png_has_intrinsics_only() {
    let img = ImageBuffer::from_pixel(8, 8, Rgba([10u8, 20, 30, 255]));
    let png = encode_png(&img, None);
    let record = MetadataReader::default().read_bytes(&png, "plain.png").unwrap();
    assert_eq!(
        record.fields.keys().collect::<Vec<_>>(),
        vec!["Filename", "Size", "Dimensions", "Format", "Mode"]
    );
}

#[test]
fn test_undecodable_bytes_are_an_error() {
    assert!(MetadataReader::default().read_bytes(b"\x89PNG\r\n\x1a\nbroken", "bad.png").is_err());
    assert!(MetadataReader::default().read_bytes(b"hello", "bad.bin").is_err());
}

#[test]
fn test_read_image_keeps_field_order() {
    let image = DynamicImage::ImageRgba8(stealth_image(PARAMS));
    let info = ImageIntrinsics::from_image(&image, "raw.png", 10, Some(ImageFormat::Png));
    let record = MetadataReader::default().read_image(&image, &info);

    let keys: Vec<&str> = record.fields.keys().collect();
    let prompt = record.fields.position("Prompt").unwrap();
    let negative = record.fields.position("Negative Prompt").unwrap();
    let first_intrinsic = record.fields.position("Filename").unwrap();
    assert!(prompt < negative);
    assert!(keys[..first_intrinsic].iter().all(|k| !["Size", "Dimensions", "Format", "Mode"].contains(k)));
    assert_eq!(keys.len(), first_intrinsic + 5);
}

#[test]
fn test_long_prompt_is_truncated() {
    let text = format!("{}Steps: 1", "p".repeat(1001));
    let image = DynamicImage::ImageRgba8(embed_bits(&stealth_bits(text.as_bytes()), 120, 80));
    let info = ImageIntrinsics::from_image(&image, "long.png", 10, None);
    let record = MetadataReader::default().read_image(&image, &info);
    assert_eq!(record.get("Prompt").map(|p| p.chars().count()), Some(1003));
    assert!(record.get("Prompt").unwrap().ends_with("..."));
    assert_eq!(record.get("Format"), Some("Unknown"));
}

#[test]
fn test_renderings() {
    let png = encode_png(&stealth_image("sky\nSteps: 9"), None);
    let record = MetadataReader::default().read_bytes(&png, "s.png").unwrap();

    assert!(render_lines(&record).starts_with("Prompt: sky\n\nSteps: 9\nFilename: s.png"));

    let doc = export_document(&[record.clone(), record]);
    assert_eq!(doc.matches("\n---\n").count(), 1);
    assert!(doc.starts_with("Prompt: |\n  sky\n\nSteps: 9\n"));
}

#[test]
fn test_concurrent_readers() {
    let png = encode_png(&stealth_image(PARAMS), None);
    let reader = MetadataReader::default();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let (png, reader) = (&png, &reader);
                s.spawn(move || reader.read_bytes(png, &format!("{i}.png")).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().get("Steps"), Some("20"));
        }
    });
}
