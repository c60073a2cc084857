//! Reconciliation engine
//!
//! Diffs the file-store inventory against the repository snapshot:
//! - **Upsert** every inventory entry the repository lacks, or holds with a
//!   strictly older timestamp (instant comparison)
//! - **Delete** every repository id absent from the inventory
//!
//! Planning is pure; [`apply_plan`] performs the repository calls.

use cpa_core::codec::decompress;
use cpa_core::effects::RepositoryEffects;
use cpa_core::{CpaResult, InventoryEntry, RepositorySnapshot};
use serde::Serialize;
use tracing::{debug, info};

use crate::activation::ActivationReport;
use crate::inventory::{format_timestamp, parse_timestamp, Inventory};

/// Repository changes needed to match the inventory
#[derive(Debug, Default)]
pub struct SyncPlan<'a> {
    /// New or modified documents
    pub upserts: Vec<&'a InventoryEntry>,
    /// Repository ids no longer present in the file store, sorted
    pub deletes: Vec<String>,
    /// Inventory ids the repository already holds current
    pub unchanged: Vec<String>,
}

impl SyncPlan<'_> {
    /// Whether applying the plan would change nothing
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Outcome of one sync run
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    /// Activation performed at the start of the run, when folded into sync
    pub activation: Option<ActivationReport>,
    /// Ids upserted to the repository
    pub upserted: Vec<String>,
    /// Ids deleted from the repository
    pub deleted: Vec<String>,
    /// Ids already current
    pub unchanged: Vec<String>,
}

/// Whether an inventory timestamp should replace the repository's
pub fn should_upsert(
    inventory_entry: &InventoryEntry,
    repository_timestamp: Option<&str>,
) -> CpaResult<bool> {
    match repository_timestamp {
        None => Ok(true),
        Some(value) => Ok(inventory_entry.timestamp > parse_timestamp(value)?),
    }
}

/// Compute the upsert and delete sets.
///
/// Fails if a repository timestamp is not an ISO-8601 instant.
pub fn plan_reconciliation<'a>(
    inventory: &'a Inventory,
    snapshot: &RepositorySnapshot,
) -> CpaResult<SyncPlan<'a>> {
    let mut plan = SyncPlan::default();
    for (document_id, entry) in inventory {
        let current = snapshot.get(document_id).map(String::as_str);
        if should_upsert(entry, current)? {
            plan.upserts.push(entry);
        } else {
            plan.unchanged.push(document_id.clone());
        }
    }
    plan.deletes = snapshot
        .keys()
        .filter(|document_id| !inventory.contains_key(*document_id))
        .cloned()
        .collect();
    plan.deletes.sort();
    Ok(plan)
}

/// Perform the repository calls of `plan`, upserts first
pub async fn apply_plan<R: RepositoryEffects + ?Sized>(
    repository: &R,
    plan: &SyncPlan<'_>,
) -> CpaResult<SyncReport> {
    let mut report = SyncReport {
        unchanged: plan.unchanged.clone(),
        ..SyncReport::default()
    };

    for document_id in &plan.unchanged {
        debug!(document_id = %document_id, "Skipping upsert for unmodified CPA");
    }
    if plan.is_empty() {
        info!(unchanged = plan.unchanged.len(), "Repository already matches file store");
        return Ok(report);
    }

    for entry in &plan.upserts {
        let timestamp = format_timestamp(entry.timestamp);
        info!(
            document_id = %entry.document_id,
            timestamp = %timestamp,
            "Upserting new/modified CPA"
        );
        let content = decompress(&entry.payload)?;
        repository.upsert(&content, &timestamp).await?;
        report.upserted.push(entry.document_id.clone());
    }

    for document_id in &plan.deletes {
        info!(document_id = %document_id, "Deleting stale CPA");
        repository.delete(document_id).await?;
        report.deleted.push(document_id.clone());
    }

    Ok(report)
}
