//! Unified error system for CPA synchronization
//!
//! A single error type covers the codecs, the collaborators and the
//! reconciliation/promotion logic. Variants follow the failure taxonomy of
//! the sync run: some only skip one file, others abort the whole run.

use serde::{Deserialize, Serialize};

/// Unified error type for all CPA sync operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CpaError {
    /// Quarantine filename does not follow the `MMddHHmm_<id>._R_..._R_.qrntn` grammar
    #[error("Malformed filename {filename}: {message}")]
    MalformedFilename {
        /// Offending filename
        filename: String,
        /// What part of the grammar was violated
        message: String,
    },

    /// Two file-store entries carry the same document id
    #[error("File store contains duplicate CPA id {document_id}. Aborting sync.")]
    DuplicateDocumentId {
        /// The id found more than once
        document_id: String,
    },

    /// No `cpaid` attribute found in document content
    #[error("No CPA id found in {filename}")]
    MissingDocumentId {
        /// File whose content lacked an id
        filename: String,
    },

    /// File-store transport failure
    #[error("File store error{}: {message}", .code.map(|c| format!(" [{c}]")).unwrap_or_default())]
    FileStore {
        /// Transport-specific error code, when the transport reports one
        code: Option<i32>,
        /// Error message describing the failure
        message: String,
    },

    /// Repository (HTTP) failure
    #[error("Repository error{}: {message}", .status.map(|s| format!(" [{s}]")).unwrap_or_default())]
    Repository {
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Error message describing the failure
        message: String,
    },

    /// Archive database failure
    #[error("Archive error: {message}")]
    Archive {
        /// Error message describing the failure
        message: String,
    },

    /// Live record to propagate into does not exist
    #[error("No live record for {document_id}")]
    LiveRecordMissing {
        /// Canonical id that had no live row
        document_id: String,
    },

    /// Compression or decoding failure
    #[error("Codec error: {message}")]
    Codec {
        /// Error message describing the failure
        message: String,
    },

    /// Invalid input
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Invalid configuration
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl CpaError {
    /// Create a malformed filename error
    pub fn malformed_filename(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFilename {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate document id error
    pub fn duplicate_document_id(document_id: impl Into<String>) -> Self {
        Self::DuplicateDocumentId {
            document_id: document_id.into(),
        }
    }

    /// Create a missing document id error
    pub fn missing_document_id(filename: impl Into<String>) -> Self {
        Self::MissingDocumentId {
            filename: filename.into(),
        }
    }

    /// Create a file-store error without a transport code
    pub fn file_store(message: impl Into<String>) -> Self {
        Self::FileStore {
            code: None,
            message: message.into(),
        }
    }

    /// Create a file-store error carrying the transport's error code
    pub fn file_store_code(code: i32, message: impl Into<String>) -> Self {
        Self::FileStore {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Create a repository error without a status
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            status: None,
            message: message.into(),
        }
    }

    /// Create a repository error for an HTTP status
    pub fn repository_status(status: u16, message: impl Into<String>) -> Self {
        Self::Repository {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an archive error
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Create a missing live record error
    pub fn live_record_missing(document_id: impl Into<String>) -> Self {
        Self::LiveRecordMissing {
            document_id: document_id.into(),
        }
    }

    /// Create a codec error
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Transport-specific error code, if the failing transport reported one
    pub fn transport_code(&self) -> Option<i64> {
        match self {
            Self::FileStore { code, .. } => code.map(i64::from),
            Self::Repository { status, .. } => status.map(i64::from),
            _ => None,
        }
    }

    /// Whether this error aborts a whole sync run rather than a single entry
    pub fn is_fatal_for_run(&self) -> bool {
        !matches!(
            self,
            Self::MalformedFilename { .. }
                | Self::MissingDocumentId { .. }
                | Self::LiveRecordMissing { .. }
        )
    }
}

/// Standard Result type for CPA sync operations
pub type CpaResult<T> = std::result::Result<T, CpaError>;

impl From<std::io::Error> for CpaError {
    fn from(err: std::io::Error) -> Self {
        Self::FileStore {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}
