//! Directory-backed file store
//!
//! Serves a mounted share (or any local directory) through the same
//! session interface as the SFTP transport:
//! - Remote paths are resolved beneath a fixed root
//! - Path traversal (`..`) and NUL bytes are rejected
//! - Renames overwrite an existing target, matching the remote semantics

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cpa_core::effects::{FileStoreEffects, FileStoreSession};
use cpa_core::{CpaError, CpaResult, FileEntry};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalFileStoreHandler {
    root: PathBuf,
}

impl LocalFileStoreHandler {
    /// Create a handler serving files beneath `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory remote paths are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStoreEffects for LocalFileStoreHandler {
    type Session = LocalFileStoreSession;

    async fn connect(&self) -> CpaResult<Self::Session> {
        let metadata = fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(CpaError::file_store(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        debug!(root = %self.root.display(), "Opened local file-store session");
        Ok(LocalFileStoreSession {
            root: self.root.clone(),
        })
    }
}

/// Session over a [`LocalFileStoreHandler`] root
#[derive(Debug)]
pub struct LocalFileStoreSession {
    root: PathBuf,
}

impl LocalFileStoreSession {
    /// Map a remote path onto the local root
    fn resolve(&self, remote: &str) -> CpaResult<PathBuf> {
        if remote.contains('\0') {
            return Err(CpaError::invalid(format!("path contains NUL: {remote:?}")));
        }
        let relative = Path::new(remote.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(CpaError::invalid(format!(
                        "path escapes file-store root: {remote}"
                    )))
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileStoreSession for LocalFileStoreSession {
    async fn list(&self, directory: &str) -> CpaResult<Vec<FileEntry>> {
        let dir = self.resolve(directory)?;
        let mut reader = fs::read_dir(&dir).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                debug!(path = %entry.path().display(), "Skipping non UTF-8 filename");
                continue;
            };
            let modified: DateTime<Utc> = metadata.modified()?.into();
            entries.push(FileEntry::new(filename, modified.timestamp()));
        }
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(entries)
    }

    async fn read(&self, path: &str) -> CpaResult<Vec<u8>> {
        Ok(fs::read(self.resolve(path)?).await?)
    }

    async fn rename(&self, from: &str, to: &str) -> CpaResult<()> {
        fs::rename(self.resolve(from)?, self.resolve(to)?).await?;
        info!(from, to, "Renamed file");
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> CpaResult<()> {
        fs::copy(self.resolve(from)?, self.resolve(to)?).await?;
        info!(from, to, "Copied file");
        Ok(())
    }

    async fn remove(&self, path: &str) -> CpaResult<()> {
        fs::remove_file(self.resolve(path)?).await?;
        info!(path, "Removed file");
        Ok(())
    }

    async fn close(self) -> CpaResult<()> {
        debug!(root = %self.root.display(), "Closed local file-store session");
        Ok(())
    }
}
