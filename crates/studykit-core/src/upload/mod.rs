//! Upload staging module.
//!
//! Normalizes user-selected files into a validated, deduplicated list of
//! pending uploads.

mod staging;

// Re-export public API
pub use staging::{
    ALLOWED_EXTENSIONS, FileCandidate, StagedFile, UploadStaging, file_extension, format_size,
};
