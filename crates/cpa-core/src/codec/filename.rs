//! Quarantine filename grammar
//!
//! A quarantined CPA is stored as
//! `MMddHHmm_<canonical id with dots>._R_<opaque>._R_.qrntn`, where the
//! leading eight digits are the local release month, day, hour and minute
//! (no year). Active CPAs are plain `<id>.xml` files.

use crate::errors::{CpaError, CpaResult};
use serde::{Deserialize, Serialize};

/// Suffix of files held in quarantine
pub const QUARANTINE_SUFFIX: &str = ".qrntn";

/// Suffix of active CPA files
pub const ACTIVE_SUFFIX: &str = ".xml";

/// Marker delimiting the opaque payload of a quarantine filename
pub const PAYLOAD_MARKER: &str = "._R_";

const RELEASE_FIELD_LEN: usize = 8;
const FIELD_SEPARATOR: u8 = b'_';
/// Minimum length of the id segment before its terminating separator
const MIN_ID_LEN: usize = 8;

/// Release moment encoded at the start of a quarantine filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFields {
    /// Month, 1-based as written (not range checked here)
    pub month: u32,
    /// Day of month as written
    pub day: u32,
    /// Hour as written
    pub hour: u32,
    /// Minute as written
    pub minute: u32,
}

/// Whether `filename` carries the quarantine suffix
pub fn is_quarantine_file(filename: &str) -> bool {
    filename.ends_with(QUARANTINE_SUFFIX)
}

/// Whether `filename` is an active CPA and an inventory candidate
pub fn is_active_file(filename: &str) -> bool {
    filename.ends_with(ACTIVE_SUFFIX)
}

fn check_prefix(filename: &str) -> CpaResult<()> {
    let bytes = filename.as_bytes();
    if bytes.len() <= RELEASE_FIELD_LEN || bytes[RELEASE_FIELD_LEN] != FIELD_SEPARATOR {
        return Err(CpaError::malformed_filename(
            filename,
            "does not start with 8-character timestamp and underscore",
        ));
    }
    Ok(())
}

/// Parse the `MMddHHmm` release fields of a quarantine filename.
pub fn parse_release_fields(filename: &str) -> CpaResult<ReleaseFields> {
    check_prefix(filename)?;
    let digits = &filename.as_bytes()[..RELEASE_FIELD_LEN];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(CpaError::malformed_filename(
            filename,
            "timestamp contains non-digit characters",
        ));
    }
    let field = |at: usize| u32::from(digits[at] - b'0') * 10 + u32::from(digits[at + 1] - b'0');
    Ok(ReleaseFields {
        month: field(0),
        day: field(2),
        hour: field(4),
        minute: field(6),
    })
}

fn with_active_suffix(id: &str) -> String {
    if id.ends_with('.') {
        format!("{id}xml")
    } else {
        format!("{id}{ACTIVE_SUFFIX}")
    }
}

/// Canonical active filename for a quarantine filename.
///
/// `01230800_nav.60120._R_X._R_.qrntn` becomes `nav.60120.xml`.
pub fn extract_canonical_id(filename: &str) -> CpaResult<String> {
    check_prefix(filename)?;
    let rest = &filename[RELEASE_FIELD_LEN + 1..];
    match rest.find('_') {
        Some(end) if end >= MIN_ID_LEN => Ok(with_active_suffix(&rest[..end])),
        _ => Err(CpaError::malformed_filename(
            filename,
            "no proper CPA id between first and second underscore",
        )),
    }
}

/// Timestamp-prefixed id segment addressing the still-quarantined archive
/// generation.
///
/// `01230800_nav.60120._R_X._R_.qrntn` becomes `01230800_nav.60120.xml`.
pub fn extract_raw_id_segment(filename: &str) -> CpaResult<String> {
    check_prefix(filename)?;
    match filename.find(PAYLOAD_MARKER) {
        Some(end) if end >= RELEASE_FIELD_LEN => Ok(with_active_suffix(&filename[..end])),
        _ => Err(CpaError::malformed_filename(
            filename,
            "no payload marker after the CPA id",
        )),
    }
}

/// Document id used as lookup key for an active filename: the `.xml`
/// suffix is dropped and dots become colons (`nav.60120.xml` -> `nav:60120`).
pub fn document_id_from_filename(filename: &str) -> String {
    filename
        .strip_suffix(ACTIVE_SUFFIX)
        .unwrap_or(filename)
        .replace('.', ":")
}

/// Both identities of a quarantined document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionTarget {
    /// Quarantine filename the target was derived from
    pub quarantine_filename: String,
    /// Filename the document will have once active
    pub canonical_filename: String,
    /// Document id once active (`nav:60120`)
    pub canonical_id: String,
    /// Document id of the quarantined generation (`01230800_nav:60120`)
    pub raw_id: String,
}

impl PromotionTarget {
    /// Derive both identities from a quarantine filename
    pub fn from_quarantine_filename(filename: &str) -> CpaResult<Self> {
        let canonical_filename = extract_canonical_id(filename)?;
        let raw_filename = extract_raw_id_segment(filename)?;
        Ok(Self {
            quarantine_filename: filename.to_string(),
            canonical_id: document_id_from_filename(&canonical_filename),
            raw_id: document_id_from_filename(&raw_filename),
            canonical_filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const EXAMPLE: &str = "01230800_nav.60120._R_Zm9ybnllbHNl._R_.qrntn";

    #[test]
    fn test_release_fields() {
        let fields = parse_release_fields(EXAMPLE).unwrap();
        assert_eq!(
            fields,
            ReleaseFields {
                month: 1,
                day: 23,
                hour: 8,
                minute: 0
            }
        );
    }

    #[test]
    fn test_release_fields_rejects_bad_layout() {
        for name in [
            "01270800",
            "0127080_nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "012708000_nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "01270800-nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "0127080X_nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "X1270800_nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "",
        ] {
            assert_matches!(
                parse_release_fields(name),
                Err(CpaError::MalformedFilename { .. }),
                "{name}"
            );
        }
    }

    #[test]
    fn test_canonical_id() {
        assert_eq!(extract_canonical_id(EXAMPLE).unwrap(), "nav.60120.xml");
        assert_eq!(
            extract_canonical_id("01230800_nav.60120_R_Zm9ybnllbHNl._R_.qrntn").unwrap(),
            "nav.60120.xml"
        );
        assert_eq!(
            extract_canonical_id("01230800_nav.60120_").unwrap(),
            "nav.60120.xml"
        );
        assert_eq!(
            extract_canonical_id("01230800_nav.qass.60120._R_Zm9ybnllbHNl._R_.qrntn").unwrap(),
            "nav.qass.60120.xml"
        );
    }

    #[test]
    fn test_canonical_id_rejects_bad_layout() {
        for name in [
            "01230800_nav.60120.Zm9ybnllbHNl.qrntn",
            "01230800_n60120._R_Zm9ybnllbHNl._R_.qrntn",
            "01230800nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "01230800nav.60120.Zm9ybnllbHNl.qrntn",
            "012308000_nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "0123080_nav.60120._R_Zm9ybnllbHNl._R_.qrntn",
            "short",
        ] {
            assert!(extract_canonical_id(name).is_err(), "{name}");
        }
    }

    #[test]
    fn test_raw_id_segment() {
        assert_eq!(
            extract_raw_id_segment(EXAMPLE).unwrap(),
            "01230800_nav.60120.xml"
        );
        assert_eq!(
            extract_raw_id_segment("01230800_nav.qass.60120._R_Zm9ybnllbHNl._R_.qrntn").unwrap(),
            "01230800_nav.qass.60120.xml"
        );
        assert!(extract_raw_id_segment("01230800_nav.60120_").is_err());
    }

    #[test]
    fn test_promotion_target() {
        let target = PromotionTarget::from_quarantine_filename(EXAMPLE).unwrap();
        assert_eq!(target.canonical_filename, "nav.60120.xml");
        assert_eq!(target.canonical_id, "nav:60120");
        assert_eq!(target.raw_id, "01230800_nav:60120");
    }

    #[test]
    fn test_suffix_recognition() {
        assert!(is_quarantine_file(EXAMPLE));
        assert!(!is_quarantine_file("01230800_nav.60120._R_Zm9ybnllbHNl._R_"));
        assert!(is_active_file("nav.qass.12345.xml"));
        assert!(!is_active_file("nav.qass.12345.txt"));
    }
}
