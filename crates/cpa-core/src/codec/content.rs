//! CPA content codec: gzip for transit and `cpaid` extraction

use crate::errors::{CpaError, CpaResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Read, Write};

static CPA_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r#"cpaid="(?P<cpa_id>.+?)""#).unwrap()
});

/// Gzip the UTF-8 bytes of `text`.
///
/// The gzip header carries no timestamp, so equal input gives equal output.
pub fn compress(text: &str) -> CpaResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| CpaError::codec(format!("gzip write failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CpaError::codec(format!("gzip finish failed: {e}")))
}

/// Inverse of [`compress`]
pub fn decompress(bytes: &[u8]) -> CpaResult<String> {
    let mut text = String::new();
    GzDecoder::new(bytes)
        .read_to_string(&mut text)
        .map_err(|e| CpaError::codec(format!("gzip read failed: {e}")))?;
    Ok(text)
}

/// Quoted value of the first `cpaid` attribute in the document, if any
pub fn extract_document_id(text: &str) -> Option<String> {
    CPA_ID_PATTERN
        .captures(text)
        .and_then(|caps| caps.name("cpa_id"))
        .map(|m| m.as_str().to_string())
}
