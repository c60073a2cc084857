//! Domain types shared by the sync and promotion flows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Surrogate key of an archive generation; strictly increasing per insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArchiveId(pub i64);

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partner, endpoint and certificate fields copied verbatim across archive
/// generations and propagated onto the live record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerFields {
    /// Partner the agreement belongs to
    pub partner_id: String,
    /// Our own CPP id referenced by the agreement
    pub nav_cpp_id: String,
    /// Subject DN of the partner certificate
    pub partner_subject_dn: String,
    /// Partner endpoint address
    pub partner_endpoint: String,
    /// Mail receiver for the partner channel
    pub mail_receiver: Option<String>,
    /// Free-text reason recorded with the generation
    pub reason: Option<String>,
    /// Who created the generation
    pub created_by: String,
    /// Start of the certificate validity window
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the certificate validity window
    pub valid_to: Option<DateTime<Utc>>,
}

/// One immutable generation of a document's state in the archive.
///
/// The newest generation (highest [`ArchiveId`]) for a document id is the
/// document's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedRecord {
    /// Surrogate key
    pub id: ArchiveId,
    /// Document (CPA) id this generation belongs to
    pub document_id: String,
    /// Pending scheduled activation
    pub quarantined: bool,
    /// Tombstoned generation
    pub deleted: bool,
    /// Partner CPP reference
    pub partner_reference_id: String,
    /// Intake (mottak) reference
    pub mottak_reference_id: String,
    /// Static partner fields
    pub partner: PartnerFields,
    /// When this generation was inserted
    pub created: DateTime<Utc>,
}

/// Current operational row consumers read for an active document id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRecord {
    /// Document (CPA) id
    pub document_id: String,
    /// Partner CPP reference
    pub partner_reference_id: String,
    /// Intake (mottak) reference
    pub mottak_reference_id: String,
    /// Fields mirrored from the newest archive generation
    pub partner: PartnerFields,
}

/// A file as listed by the file store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Bare filename within the listed directory
    pub filename: String,
    /// Last modification, whole seconds since the Unix epoch
    pub last_modified_epoch_secs: i64,
}

impl FileEntry {
    /// Convenience constructor
    pub fn new(filename: impl Into<String>, last_modified_epoch_secs: i64) -> Self {
        Self {
            filename: filename.into(),
            last_modified_epoch_secs,
        }
    }
}

/// One document found in the file store during a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    /// Id extracted from the document content
    pub document_id: String,
    /// Last-modified instant, second precision
    pub timestamp: DateTime<Utc>,
    /// Gzip-compressed document content
    pub payload: Vec<u8>,
}

/// Document id to timestamp mapping reported by the repository
pub type RepositorySnapshot = HashMap<String, String>;
