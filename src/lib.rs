pub mod core {
    pub mod decoder;
    pub mod error;
    pub mod metadata;
}

pub mod formats {
    pub mod document;
    pub mod header;
    pub mod parameters;
}

pub mod utils {
    pub mod text_chunks;
}

pub use crate::core::decoder::{extract_payload, read_stealth_parameters, ScanOutcome};
pub use crate::core::error::MetadataError;
pub use crate::core::metadata::{ImageIntrinsics, MetadataReader, MetadataRecord, StructuredMetadata};
