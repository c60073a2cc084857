//! In-memory archive and live tables
//!
//! Generations get strictly increasing ids; the newest generation for a
//! document id is the one with the highest id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cpa_core::effects::ArchiveEffects;
use cpa_core::{ArchiveId, ArchivedRecord, CpaError, CpaResult, LiveRecord, PartnerFields};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Archive operation, for call logs and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveOp {
    /// `find_latest_by_document_id`
    FindLatest,
    /// `insert_copy_of`
    InsertCopy,
    /// `mark_deleted`
    MarkDeleted,
    /// `restamp_as_new`
    Restamp,
    /// `propagate_to_live`
    PropagateToLive,
    /// `delete_live_by_document_id`
    DeleteLive,
    /// `count_quarantined`
    CountQuarantined,
}

#[derive(Debug, Default)]
struct ArchiveState {
    rows: Vec<ArchivedRecord>,
    live: BTreeMap<String, LiveRecord>,
    next_id: i64,
    calls: Vec<ArchiveOp>,
    failures: HashMap<ArchiveOp, CpaError>,
}

impl ArchiveState {
    fn record(&mut self, op: ArchiveOp) -> CpaResult<()> {
        self.calls.push(op);
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn allocate_id(&mut self) -> ArchiveId {
        self.next_id += 1;
        ArchiveId(self.next_id)
    }

    fn row_mut(&mut self, id: ArchiveId) -> CpaResult<&mut ArchivedRecord> {
        self.rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| CpaError::archive(format!("No archive row with id {id}")))
    }
}

/// Shared in-memory archive
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    state: Arc<Mutex<ArchiveState>>,
}

impl MemoryArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a generation and return its id
    pub fn insert_generation(
        &self,
        document_id: &str,
        quarantined: bool,
        deleted: bool,
        partner: PartnerFields,
        created: DateTime<Utc>,
    ) -> ArchiveId {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.rows.push(ArchivedRecord {
            id,
            document_id: document_id.to_string(),
            quarantined,
            deleted,
            partner_reference_id: format!("{document_id}.cpp"),
            mottak_reference_id: format!("{document_id}.mottak"),
            partner,
            created,
        });
        id
    }

    /// Append a quarantined generation for `raw_id` together with its live row
    pub fn seed_quarantined(&self, raw_id: &str, partner: PartnerFields, created: DateTime<Utc>) -> ArchiveId {
        let id = self.insert_generation(raw_id, true, false, partner.clone(), created);
        self.seed_live(raw_id, partner);
        id
    }

    /// Insert or replace a live row
    pub fn seed_live(&self, document_id: &str, partner: PartnerFields) {
        self.state.lock().live.insert(
            document_id.to_string(),
            LiveRecord {
                document_id: document_id.to_string(),
                partner_reference_id: format!("{document_id}.cpp"),
                mottak_reference_id: format!("{document_id}.mottak"),
                partner,
            },
        );
    }

    /// Every generation, oldest first
    pub fn rows(&self) -> Vec<ArchivedRecord> {
        self.state.lock().rows.clone()
    }

    /// Generations for `document_id`, oldest first
    pub fn rows_for(&self, document_id: &str) -> Vec<ArchivedRecord> {
        self.rows()
            .into_iter()
            .filter(|row| row.document_id == document_id)
            .collect()
    }

    /// Live row for `document_id`
    pub fn live(&self, document_id: &str) -> Option<LiveRecord> {
        self.state.lock().live.get(document_id).cloned()
    }

    /// Ids with a live row, sorted
    pub fn live_ids(&self) -> Vec<String> {
        self.state.lock().live.keys().cloned().collect()
    }

    /// Every operation invoked, in order
    pub fn calls(&self) -> Vec<ArchiveOp> {
        self.state.lock().calls.clone()
    }

    /// Make `op` fail with `err`
    pub fn fail_on(&self, op: ArchiveOp, err: CpaError) {
        self.state.lock().failures.insert(op, err);
    }
}

#[async_trait]
impl ArchiveEffects for MemoryArchive {
    async fn find_latest_by_document_id(
        &self,
        document_id: &str,
    ) -> CpaResult<Option<ArchivedRecord>> {
        let mut state = self.state.lock();
        state.record(ArchiveOp::FindLatest)?;
        Ok(state
            .rows
            .iter()
            .filter(|row| row.document_id == document_id)
            .max_by_key(|row| row.id)
            .cloned())
    }

    async fn insert_copy_of(&self, id: ArchiveId) -> CpaResult<ArchiveId> {
        let mut state = self.state.lock();
        state.record(ArchiveOp::InsertCopy)?;
        let mut copy = state.row_mut(id)?.clone();
        copy.id = state.allocate_id();
        let new_id = copy.id;
        state.rows.push(copy);
        Ok(new_id)
    }

    async fn mark_deleted(&self, id: ArchiveId) -> CpaResult<()> {
        let mut state = self.state.lock();
        state.record(ArchiveOp::MarkDeleted)?;
        state.row_mut(id)?.deleted = true;
        Ok(())
    }

    async fn restamp_as_new(
        &self,
        id: ArchiveId,
        new_document_id: &str,
        reference_token: &str,
    ) -> CpaResult<()> {
        let mut state = self.state.lock();
        state.record(ArchiveOp::Restamp)?;
        let row = state.row_mut(id)?;
        row.document_id = new_document_id.to_string();
        row.quarantined = false;
        row.deleted = false;
        row.partner_reference_id = reference_token.to_string();
        row.mottak_reference_id = reference_token.to_string();
        Ok(())
    }

    async fn propagate_to_live(&self, document_id: &str, from: ArchiveId) -> CpaResult<u64> {
        let mut state = self.state.lock();
        state.record(ArchiveOp::PropagateToLive)?;
        let source = state.row_mut(from)?.clone();
        match state.live.get_mut(document_id) {
            Some(live) => {
                live.partner_reference_id = source.partner_reference_id;
                live.mottak_reference_id = source.mottak_reference_id;
                live.partner = source.partner;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_live_by_document_id(&self, document_id: &str) -> CpaResult<u64> {
        let mut state = self.state.lock();
        state.record(ArchiveOp::DeleteLive)?;
        Ok(u64::from(state.live.remove(document_id).is_some()))
    }

    async fn count_quarantined(&self) -> CpaResult<u64> {
        let mut state = self.state.lock();
        state.record(ArchiveOp::CountQuarantined)?;
        Ok(state.rows.iter().filter(|row| row.quarantined).count() as u64)
    }
}
