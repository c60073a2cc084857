//! Inventory snapshotter
//!
//! Builds the `{document id -> (timestamp, compressed content)}` view of the
//! file store for one sync run. A document id seen twice aborts the run:
//! picking one of two conflicting files could corrupt the repository.

use chrono::{DateTime, SecondsFormat, Utc};
use cpa_core::codec::{compress, extract_document_id, is_active_file};
use cpa_core::effects::{remote_path, FileStoreSession};
use cpa_core::{CpaError, CpaResult, FileEntry, InventoryEntry};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Inventory of one sync run, keyed by document id
pub type Inventory = BTreeMap<String, InventoryEntry>;

/// Last-modified epoch seconds as a second-precision instant
pub fn last_modified_instant(epoch_secs: i64) -> CpaResult<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_secs, 0)
        .ok_or_else(|| CpaError::invalid(format!("modification time {epoch_secs} out of range")))
}

/// ISO-8601 form used on the wire (`2025-01-01T00:00:00Z`)
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a repository timestamp as an instant
pub fn parse_timestamp(value: &str) -> CpaResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CpaError::invalid(format!("invalid timestamp {value:?}: {e}")))
}

/// Build the inventory of every `.xml` file in `directory`.
///
/// Files without a `cpaid` are skipped with a warning; a duplicate id fails
/// the whole build and no partial inventory is returned.
pub async fn build_inventory<S: FileStoreSession>(
    session: &S,
    directory: &str,
) -> CpaResult<Inventory> {
    let mut inventory = Inventory::new();
    for entry in session.list(directory).await? {
        if !is_active_file(&entry.filename) {
            debug!(filename = %entry.filename, "Ignored, invalid file ending");
            continue;
        }
        let item = match snapshot_entry(session, directory, &entry).await {
            Ok(item) => item,
            Err(err) if !err.is_fatal_for_run() => {
                warn!(
                    filename = %entry.filename,
                    error = %err,
                    "Skipping file. File corrupted or pattern mismatch"
                );
                continue;
            }
            Err(err) => return Err(err),
        };
        if inventory.contains_key(&item.document_id) {
            return Err(CpaError::duplicate_document_id(item.document_id));
        }
        inventory.insert(item.document_id.clone(), item);
    }
    debug!(count = inventory.len(), "Built file-store inventory");
    Ok(inventory)
}

async fn snapshot_entry<S: FileStoreSession>(
    session: &S,
    directory: &str,
    entry: &FileEntry,
) -> CpaResult<InventoryEntry> {
    let timestamp = last_modified_instant(entry.last_modified_epoch_secs)?;
    let bytes = session.read(&remote_path(directory, &entry.filename)).await?;
    let content = String::from_utf8_lossy(&bytes);

    let document_id = extract_document_id(&content)
        .ok_or_else(|| CpaError::missing_document_id(entry.filename.clone()))?;

    Ok(InventoryEntry {
        document_id,
        timestamp,
        payload: compress(&content)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpa_core::effects::FileStoreEffects;
    use cpa_testkit::fixtures::{cpa_document, cpa_path, CPA_DIRECTORY};
    use cpa_testkit::MemoryFileStore;

    #[tokio::test]
    async fn test_file_without_cpa_id_is_skipped() {
        let store = MemoryFileStore::new()
            .with_file(&cpa_path("nav.1.xml"), cpa_document("nav:1"), 1_735_689_600)
            .with_file(&cpa_path("broken.xml"), "<cppa:CollaborationProtocolAgreement/>", 1_735_689_600)
            .with_file(&cpa_path("nav.2.xml"), cpa_document("nav:2"), 1_735_689_600);
        let session = store.connect().await.unwrap();

        let inventory = build_inventory(&session, CPA_DIRECTORY).await.unwrap();

        assert_eq!(
            inventory.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["nav:1", "nav:2"]
        );
    }

    #[tokio::test]
    async fn test_read_failure_still_aborts_build() {
        let store = MemoryFileStore::new()
            .with_file(&cpa_path("nav.1.xml"), cpa_document("nav:1"), 1_735_689_600);
        store.fail_on(
            cpa_testkit::FileOp::Read,
            &cpa_path("nav.1.xml"),
            CpaError::file_store_code(4, "Failure"),
        );
        let session = store.connect().await.unwrap();

        let err = build_inventory(&session, CPA_DIRECTORY).await.unwrap_err();
        assert!(err.is_fatal_for_run());
    }

    #[test]
    fn test_timestamp_formatting() {
        let t = last_modified_instant(1_735_689_600).unwrap();
        assert_eq!(format_timestamp(t), "2025-01-01T00:00:00Z");
        assert_eq!(parse_timestamp("2025-01-01T00:00:00Z").unwrap(), t);
        assert_eq!(parse_timestamp("2025-01-01T01:00:00+01:00").unwrap(), t);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
