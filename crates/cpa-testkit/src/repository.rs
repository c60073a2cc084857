//! Recording CPA repository
//!
//! Keeps a `{id -> timestamp}` snapshot that upserts and deletes update, so
//! a second sync against the same store sees the first one's writes.

use async_trait::async_trait;
use cpa_core::codec::extract_document_id;
use cpa_core::effects::RepositoryEffects;
use cpa_core::{CpaError, CpaResult, RepositorySnapshot};
use parking_lot::Mutex;
use std::sync::Arc;

/// A recorded repository call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryCall {
    /// `timestamps()`
    Timestamps,
    /// `upsert(content, timestamp)`
    Upsert {
        /// Uncompressed document
        content: String,
        /// ISO-8601 last-modified instant
        timestamp: String,
    },
    /// `delete(id)`
    Delete(String),
}

#[derive(Debug, Default)]
struct RepositoryState {
    snapshot: RepositorySnapshot,
    calls: Vec<RepositoryCall>,
    timestamps_error: Option<CpaError>,
    upsert_error: Option<CpaError>,
}

/// In-memory repository recording every call
#[derive(Debug, Clone, Default)]
pub struct RecordingRepository {
    state: Arc<Mutex<RepositoryState>>,
}

impl RecordingRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a held document and return the repository
    pub fn with_timestamp(self, document_id: &str, timestamp: &str) -> Self {
        self.state
            .lock()
            .snapshot
            .insert(document_id.to_string(), timestamp.to_string());
        self
    }

    /// Current `{id -> timestamp}` view
    pub fn snapshot(&self) -> RepositorySnapshot {
        self.state.lock().snapshot.clone()
    }

    /// Every call, in order
    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.state.lock().calls.clone()
    }

    /// Document ids of every upsert, in order
    pub fn upserted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RepositoryCall::Upsert { content, .. } => extract_document_id(&content),
                _ => None,
            })
            .collect()
    }

    /// Ids of every delete, in order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RepositoryCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls, keeping the snapshot
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Make `timestamps` fail with `err`
    pub fn fail_timestamps(&self, err: CpaError) {
        self.state.lock().timestamps_error = Some(err);
    }

    /// Make every `upsert` fail with `err`
    pub fn fail_upserts(&self, err: CpaError) {
        self.state.lock().upsert_error = Some(err);
    }
}

#[async_trait]
impl RepositoryEffects for RecordingRepository {
    async fn timestamps(&self) -> CpaResult<RepositorySnapshot> {
        let mut state = self.state.lock();
        state.calls.push(RepositoryCall::Timestamps);
        match &state.timestamps_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.snapshot.clone()),
        }
    }

    async fn upsert(&self, content: &str, timestamp: &str) -> CpaResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RepositoryCall::Upsert {
            content: content.to_string(),
            timestamp: timestamp.to_string(),
        });
        if let Some(err) = &state.upsert_error {
            return Err(err.clone());
        }
        let document_id = extract_document_id(content)
            .ok_or_else(|| CpaError::repository_status(400, "CPA id missing from document"))?;
        state.snapshot.insert(document_id, timestamp.to_string());
        Ok(())
    }

    async fn delete(&self, document_id: &str) -> CpaResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RepositoryCall::Delete(document_id.to_string()));
        state.snapshot.remove(document_id);
        Ok(())
    }
}
