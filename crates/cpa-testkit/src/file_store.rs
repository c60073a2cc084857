//! In-memory file store
//!
//! Files are keyed by absolute remote path. Every handle shares one state,
//! so a test keeps a clone to inspect files, calls and session counts after
//! the code under test has closed its session.

use async_trait::async_trait;
use cpa_core::effects::{FileStoreEffects, FileStoreSession};
use cpa_core::{CpaError, CpaResult, FileEntry};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Error code reported for a missing file, as SFTP's `SSH_FX_NO_SUCH_FILE`
pub const NO_SUCH_FILE: i32 = 2;

/// Kind of file-store operation, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOp {
    /// Directory listing
    List,
    /// File read
    Read,
    /// Rename
    Rename,
    /// Copy
    Copy,
    /// Remove
    Remove,
}

/// A recorded file-store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCall {
    /// `list(directory)`
    List(String),
    /// `read(path)`
    Read(String),
    /// `rename(from, to)`
    Rename {
        /// Source path
        from: String,
        /// Target path
        to: String,
    },
    /// `copy(from, to)`
    Copy {
        /// Source path
        from: String,
        /// Target path
        to: String,
    },
    /// `remove(path)`
    Remove(String),
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    last_modified_epoch_secs: i64,
}

#[derive(Debug, Default)]
struct FileStoreState {
    files: BTreeMap<String, StoredFile>,
    calls: Vec<FileCall>,
    sessions_opened: usize,
    sessions_closed: usize,
    connect_error: Option<CpaError>,
    failures: HashMap<(FileOp, String), CpaError>,
}

impl FileStoreState {
    fn check(&self, op: FileOp, path: &str) -> CpaResult<()> {
        match self.failures.get(&(op, path.to_string())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn file(&self, path: &str) -> CpaResult<StoredFile> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CpaError::file_store_code(NO_SUCH_FILE, format!("No such file: {path}")))
    }
}

/// Shared in-memory file store
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    state: Arc<Mutex<FileStoreState>>,
}

impl MemoryFileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and return the store
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>, last_modified_epoch_secs: i64) -> Self {
        self.insert_file(path, content, last_modified_epoch_secs);
        self
    }

    /// Add or replace a file
    pub fn insert_file(&self, path: &str, content: impl Into<Vec<u8>>, last_modified_epoch_secs: i64) {
        self.state.lock().files.insert(
            path.to_string(),
            StoredFile {
                content: content.into(),
                last_modified_epoch_secs,
            },
        );
    }

    /// Content of the file at `path`
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).map(|f| f.content.clone())
    }

    /// Whether a file exists at `path`
    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().files.contains_key(path)
    }

    /// Names of the files directly under `directory`, sorted
    pub fn filenames(&self, directory: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .files
            .keys()
            .filter_map(|path| child_name(directory, path))
            .map(str::to_string)
            .collect()
    }

    /// Every call made through any session, in order
    pub fn calls(&self) -> Vec<FileCall> {
        self.state.lock().calls.clone()
    }

    /// Sessions handed out so far
    pub fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    /// Sessions closed so far
    pub fn sessions_closed(&self) -> usize {
        self.state.lock().sessions_closed
    }

    /// Sessions currently open
    pub fn open_sessions(&self) -> usize {
        let state = self.state.lock();
        state.sessions_opened - state.sessions_closed
    }

    /// Make every `connect` fail with `err`
    pub fn fail_connect(&self, err: CpaError) {
        self.state.lock().connect_error = Some(err);
    }

    /// Make `op` on `path` fail with `err`. For [`FileOp::List`] the path is
    /// the directory; for rename and copy it is the source.
    pub fn fail_on(&self, op: FileOp, path: &str, err: CpaError) {
        self.state.lock().failures.insert((op, path.to_string()), err);
    }

    /// Drop every failure registered with [`Self::fail_on`]
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }
}

fn child_name<'a>(directory: &str, path: &'a str) -> Option<&'a str> {
    let name = path
        .strip_prefix(directory.trim_end_matches('/'))?
        .strip_prefix('/')?;
    (!name.is_empty() && !name.contains('/')).then_some(name)
}

#[async_trait]
impl FileStoreEffects for MemoryFileStore {
    type Session = MemoryFileStoreSession;

    async fn connect(&self) -> CpaResult<Self::Session> {
        let mut state = self.state.lock();
        if let Some(err) = &state.connect_error {
            return Err(err.clone());
        }
        state.sessions_opened += 1;
        Ok(MemoryFileStoreSession {
            state: Arc::clone(&self.state),
        })
    }
}

/// Session over a [`MemoryFileStore`]
#[derive(Debug)]
pub struct MemoryFileStoreSession {
    state: Arc<Mutex<FileStoreState>>,
}

#[async_trait]
impl FileStoreSession for MemoryFileStoreSession {
    async fn list(&self, directory: &str) -> CpaResult<Vec<FileEntry>> {
        let mut state = self.state.lock();
        state.calls.push(FileCall::List(directory.to_string()));
        state.check(FileOp::List, directory)?;
        Ok(state
            .files
            .iter()
            .filter_map(|(path, file)| {
                child_name(directory, path)
                    .map(|name| FileEntry::new(name, file.last_modified_epoch_secs))
            })
            .collect())
    }

    async fn read(&self, path: &str) -> CpaResult<Vec<u8>> {
        let mut state = self.state.lock();
        state.calls.push(FileCall::Read(path.to_string()));
        state.check(FileOp::Read, path)?;
        Ok(state.file(path)?.content)
    }

    async fn rename(&self, from: &str, to: &str) -> CpaResult<()> {
        let mut state = self.state.lock();
        state.calls.push(FileCall::Rename {
            from: from.to_string(),
            to: to.to_string(),
        });
        state.check(FileOp::Rename, from)?;
        let file = state.file(from)?;
        state.files.remove(from);
        state.files.insert(to.to_string(), file);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> CpaResult<()> {
        let mut state = self.state.lock();
        state.calls.push(FileCall::Copy {
            from: from.to_string(),
            to: to.to_string(),
        });
        state.check(FileOp::Copy, from)?;
        let file = state.file(from)?;
        state.files.insert(to.to_string(), file);
        Ok(())
    }

    async fn remove(&self, path: &str) -> CpaResult<()> {
        let mut state = self.state.lock();
        state.calls.push(FileCall::Remove(path.to_string()));
        state.check(FileOp::Remove, path)?;
        state.file(path)?;
        state.files.remove(path);
        Ok(())
    }

    async fn close(self) -> CpaResult<()> {
        self.state.lock().sessions_closed += 1;
        Ok(())
    }
}
