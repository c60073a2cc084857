//! Filename and content codecs

pub mod content;
pub mod filename;

pub use content::{compress, decompress, extract_document_id};
pub use filename::{
    document_id_from_filename, extract_canonical_id, extract_raw_id_segment, is_active_file,
    is_quarantine_file, parse_release_fields, PromotionTarget, ReleaseFields, ACTIVE_SUFFIX,
    PAYLOAD_MARKER, QUARANTINE_SUFFIX,
};
