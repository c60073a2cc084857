//! File-store effect traits
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `cpa-effects` (local directory), SFTP outside this workspace
//! - **Usage**: inventory snapshots and quarantine activation
//!
//! A session is acquired once per run and closed on every exit path. No
//! session is cached across runs.

use crate::errors::CpaResult;
use crate::types::FileEntry;
use async_trait::async_trait;

/// Opens file-store sessions
#[async_trait]
pub trait FileStoreEffects: Send + Sync {
    /// Session type handed out by this store
    type Session: FileStoreSession;

    /// Open a session (and its single channel)
    async fn connect(&self) -> CpaResult<Self::Session>;
}

/// One open file-store session. Paths are absolute remote paths.
#[async_trait]
pub trait FileStoreSession: Send + Sync + Sized {
    /// Regular files directly under `directory`
    async fn list(&self, directory: &str) -> CpaResult<Vec<FileEntry>>;

    /// Full content of the file at `path`
    async fn read(&self, path: &str) -> CpaResult<Vec<u8>>;

    /// Rename `from` to `to`, overwriting an existing `to`
    async fn rename(&self, from: &str, to: &str) -> CpaResult<()>;

    /// Copy `from` to `to`, overwriting an existing `to`
    async fn copy(&self, from: &str, to: &str) -> CpaResult<()>;

    /// Remove the file at `path`
    async fn remove(&self, path: &str) -> CpaResult<()>;

    /// Release the session and its channel
    async fn close(self) -> CpaResult<()>;
}

/// Join a directory and a bare filename into a remote path
pub fn remote_path(directory: &str, filename: &str) -> String {
    format!("{}/{}", directory.trim_end_matches('/'), filename)
}

#[async_trait]
impl<T: FileStoreEffects + ?Sized> FileStoreEffects for std::sync::Arc<T> {
    type Session = T::Session;

    async fn connect(&self) -> CpaResult<Self::Session> {
        (**self).connect().await
    }
}
