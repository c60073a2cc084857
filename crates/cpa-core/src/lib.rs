//! # CPA Core - Foundation Types
//!
//! Domain types, codecs and collaborator interfaces for synchronizing CPA
//! (collaboration-protocol agreement) documents between a file share and
//! the authoritative CPA repository.
//!
//! - [`codec::filename`]: the quarantine filename grammar
//! - [`codec::content`]: gzip transit encoding and `cpaid` extraction
//! - [`effects`]: file store, repository, archive and clock traits
//! - [`CpaError`]: the single error type used across the workspace

#![forbid(unsafe_code)]

pub mod codec;
pub mod effects;
pub mod errors;
pub mod types;

pub use errors::{CpaError, CpaResult};
pub use types::{
    ArchiveId, ArchivedRecord, FileEntry, InventoryEntry, LiveRecord, PartnerFields,
    RepositorySnapshot,
};
