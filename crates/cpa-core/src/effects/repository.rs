//! Authoritative CPA repository (HTTP) effect trait

use crate::errors::CpaResult;
use crate::types::RepositorySnapshot;
use async_trait::async_trait;

/// Reads and writes the authoritative CPA repository
#[async_trait]
pub trait RepositoryEffects: Send + Sync {
    /// Document id to ISO-8601 timestamp for every CPA the repository holds
    async fn timestamps(&self) -> CpaResult<RepositorySnapshot>;

    /// Insert or replace a CPA; the repository derives the id from `content`
    async fn upsert(&self, content: &str, timestamp: &str) -> CpaResult<()>;

    /// Delete the CPA with `document_id`
    async fn delete(&self, document_id: &str) -> CpaResult<()>;
}

#[async_trait]
impl<T: RepositoryEffects + ?Sized> RepositoryEffects for std::sync::Arc<T> {
    async fn timestamps(&self) -> CpaResult<RepositorySnapshot> {
        (**self).timestamps().await
    }

    async fn upsert(&self, content: &str, timestamp: &str) -> CpaResult<()> {
        (**self).upsert(content, timestamp).await
    }

    async fn delete(&self, document_id: &str) -> CpaResult<()> {
        (**self).delete(document_id).await
    }
}
