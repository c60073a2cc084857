//! # CPA Testkit
//!
//! In-memory collaborators and fixtures for exercising the sync and
//! promotion flows without a file share, repository or database.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

pub mod archive;
pub mod file_store;
pub mod fixtures;
pub mod repository;
pub mod time;

pub use archive::{ArchiveOp, MemoryArchive};
pub use file_store::{FileCall, FileOp, MemoryFileStore, MemoryFileStoreSession, NO_SUCH_FILE};
pub use repository::{RecordingRepository, RepositoryCall};
pub use time::FixedClock;
