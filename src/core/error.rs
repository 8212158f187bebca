use thiserror::Error;

/// Failures outside the codec itself: decoding the raw image bytes and
/// serializing records. A missing or damaged hidden payload is never an error.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Export error: {0}")]
    Export(#[from] serde_json::Error),
}
