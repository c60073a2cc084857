//! Archive and live-record persistence effect trait
//!
//! The archive is append-only: every identity or status change is a new
//! generation. The only in-place updates are [`ArchiveEffects::mark_deleted`]
//! and [`ArchiveEffects::restamp_as_new`], both applied to a freshly
//! inserted copy during promotion.

use crate::errors::CpaResult;
use crate::types::{ArchiveId, ArchivedRecord};
use async_trait::async_trait;

/// Archive repository over the archive and live tables
#[async_trait]
pub trait ArchiveEffects: Send + Sync {
    /// Newest generation for `document_id`
    async fn find_latest_by_document_id(
        &self,
        document_id: &str,
    ) -> CpaResult<Option<ArchivedRecord>>;

    /// Insert a verbatim copy of generation `id` and return the copy's id
    async fn insert_copy_of(&self, id: ArchiveId) -> CpaResult<ArchiveId>;

    /// Set `deleted` on generation `id`
    async fn mark_deleted(&self, id: ArchiveId) -> CpaResult<()>;

    /// Give generation `id` a new identity: `document_id`, cleared
    /// quarantine/deleted flags and both reference ids set to `reference_token`
    async fn restamp_as_new(
        &self,
        id: ArchiveId,
        new_document_id: &str,
        reference_token: &str,
    ) -> CpaResult<()>;

    /// Copy generation `from`'s fields onto the live row for `document_id`.
    /// Returns the number of live rows updated.
    async fn propagate_to_live(&self, document_id: &str, from: ArchiveId) -> CpaResult<u64>;

    /// Delete the live row for `document_id`. Returns rows deleted.
    async fn delete_live_by_document_id(&self, document_id: &str) -> CpaResult<u64>;

    /// Number of quarantined generations (diagnostic)
    async fn count_quarantined(&self) -> CpaResult<u64>;
}

#[async_trait]
impl<T: ArchiveEffects + ?Sized> ArchiveEffects for std::sync::Arc<T> {
    async fn find_latest_by_document_id(
        &self,
        document_id: &str,
    ) -> CpaResult<Option<ArchivedRecord>> {
        (**self).find_latest_by_document_id(document_id).await
    }

    async fn insert_copy_of(&self, id: ArchiveId) -> CpaResult<ArchiveId> {
        (**self).insert_copy_of(id).await
    }

    async fn mark_deleted(&self, id: ArchiveId) -> CpaResult<()> {
        (**self).mark_deleted(id).await
    }

    async fn restamp_as_new(
        &self,
        id: ArchiveId,
        new_document_id: &str,
        reference_token: &str,
    ) -> CpaResult<()> {
        (**self)
            .restamp_as_new(id, new_document_id, reference_token)
            .await
    }

    async fn propagate_to_live(&self, document_id: &str, from: ArchiveId) -> CpaResult<u64> {
        (**self).propagate_to_live(document_id, from).await
    }

    async fn delete_live_by_document_id(&self, document_id: &str) -> CpaResult<u64> {
        (**self).delete_live_by_document_id(document_id).await
    }

    async fn count_quarantined(&self) -> CpaResult<u64> {
        (**self).count_quarantined().await
    }
}
