use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use log::{debug, info, warn};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Instant;
use crate::core::decoder::read_stealth_parameters;
use crate::core::error::MetadataError;
use crate::formats::parameters::{parse_parameters, split_steps_details, DEFAULT_PROMPT_LIMIT, STEPS_FIELD};
use crate::utils::text_chunks::read_parameters_chunk;

/// Insertion-ordered string mapping. Re-inserting a key replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredMetadata {
    entries: Vec<(String, String)>,
}

impl StructuredMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for StructuredMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Properties every record carries, payload or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageIntrinsics {
    pub filename: String,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub mode: String,
}

pub const INTRINSIC_FIELDS: [&str; 5] = ["Filename", "Size", "Dimensions", "Format", "Mode"];

impl ImageIntrinsics {
    pub fn from_image(
        image: &DynamicImage,
        filename: &str,
        size_bytes: u64,
        format: Option<ImageFormat>,
    ) -> Self {
        let (width, height) = image.dimensions();
        Self {
            filename: filename.to_string(),
            size_bytes,
            width,
            height,
            format: format_name(format),
            mode: mode_name(image.color()),
        }
    }

    /// Size in MiB rounded to two decimals.
    pub fn size_mib(&self) -> f64 {
        (self.size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }

    pub fn fields(&self) -> [(&'static str, String); 5] {
        let [filename, size, dimensions, format, mode] = INTRINSIC_FIELDS;
        [
            (filename, self.filename.clone()),
            (size, format!("{} MB", display_float(self.size_mib()))),
            (dimensions, format!("{}x{}", self.width, self.height)),
            (format, self.format.clone()),
            (mode, self.mode.clone()),
        ]
    }
}

// Whole numbers keep one decimal place: 0.0, 3.0
fn display_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn format_name(format: Option<ImageFormat>) -> String {
    match format {
        Some(format) => format!("{format:?}").to_uppercase(),
        None => "Unknown".to_string(),
    }
}

pub fn mode_name(color: ColorType) -> String {
    let name = match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "F;RGB",
        ColorType::Rgba32F => "F;RGBA",
        other => return format!("{other:?}"),
    };
    name.to_string()
}

/// Merges parsed fields with intrinsics. Parsed fields come first; an
/// intrinsic name that also appears among them (`Size` is common) takes the
/// intrinsic value and moves to the intrinsic block.
pub fn assemble(parsed: Option<StructuredMetadata>, intrinsics: &ImageIntrinsics) -> StructuredMetadata {
    let mut fields = parsed.unwrap_or_default();
    for (key, value) in intrinsics.fields() {
        if fields.remove(key).is_some() {
            debug!("parsed field {:?} replaced by image property", key);
        }
        fields.insert(key, value);
    }
    fields
}

/// Final per-image result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    pub fields: StructuredMetadata,
    /// Decomposed compound `Steps` value, only with `split_steps`.
    pub details: Option<StructuredMetadata>,
}

impl MetadataRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }
}

impl Serialize for MetadataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.details.is_some());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        for (key, value) in self.fields.iter() {
            map.serialize_entry(key, value)?;
        }
        if let Some(details) = &self.details {
            map.serialize_entry("details", details)?;
        }
        map.end()
    }
}

/// Reads generation metadata from images.
#[derive(Debug, Clone)]
pub struct MetadataReader {
    /// Character limit for `Prompt` and `Negative Prompt` values.
    pub prompt_limit: usize,
    /// Look for a PNG `parameters` text chunk before scanning pixels.
    pub read_text_chunks: bool,
    /// Decompose a compound `Steps` value into `details`.
    pub split_steps: bool,
}

impl Default for MetadataReader {
    fn default() -> Self {
        Self {
            prompt_limit: DEFAULT_PROMPT_LIMIT,
            read_text_chunks: true,
            split_steps: false,
        }
    }
}

impl MetadataReader {
    pub fn new(prompt_limit: usize) -> Self {
        Self { prompt_limit, ..Self::default() }
    }

    /// Stealth path only: scans the decoded raster and merges the result
    /// with `intrinsics`. Never fails.
    pub fn read_image(&self, image: &DynamicImage, intrinsics: &ImageIntrinsics) -> MetadataRecord {
        let text = read_stealth_parameters(image);
        self.build_record(text, intrinsics)
    }

    /// Decodes encoded image bytes, then reads the `parameters` text chunk
    /// (PNG only) or, failing that, the stealth payload.
    pub fn read_bytes(&self, bytes: &[u8], filename: &str) -> Result<MetadataRecord, MetadataError> {
        let start = Instant::now();

        let format = image::guess_format(bytes)?;
        let image = image::load_from_memory_with_format(bytes, format)?;
        let intrinsics = ImageIntrinsics::from_image(&image, filename, bytes.len() as u64, Some(format));

        let mut text = None;
        if format == ImageFormat::Png && self.read_text_chunks {
            match read_parameters_chunk(bytes) {
                Ok(chunk) => text = chunk.filter(|t| !t.is_empty()),
                Err(e) => warn!("Could not read text chunks of {}: {}", filename, e),
            }
        }
        if text.is_none() {
            text = read_stealth_parameters(&image);
        }

        let record = self.build_record(text, &intrinsics);
        info!(
            "Read {} fields from {} in {:?} ms",
            record.fields.len(),
            filename,
            start.elapsed().as_millis()
        );
        Ok(record)
    }

    fn build_record(&self, text: Option<String>, intrinsics: &ImageIntrinsics) -> MetadataRecord {
        let mut parsed = text
            .filter(|t| !t.is_empty())
            .map(|t| parse_parameters(&t, self.prompt_limit));

        let mut details = None;
        if self.split_steps {
            if let Some(fields) = parsed.as_mut() {
                if fields.get(STEPS_FIELD).is_some_and(|v| v.contains(',')) {
                    details = fields.remove(STEPS_FIELD).map(|v| split_steps_details(&v));
                }
            }
        }

        MetadataRecord {
            fields: assemble(parsed, intrinsics),
            details,
        }
    }
}
