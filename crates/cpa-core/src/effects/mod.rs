//! Collaborator interfaces consumed by the sync and promotion logic
//!
//! Transport (SFTP), HTTP and SQL layers sit behind these traits so the
//! reconciliation and promotion code never touches I/O directly.

pub mod archive;
pub mod file_store;
pub mod repository;
pub mod time;

pub use archive::ArchiveEffects;
pub use file_store::{remote_path, FileStoreEffects, FileStoreSession};
pub use repository::RepositoryEffects;
pub use time::PhysicalTimeEffects;
