//! Quarantine activation
//!
//! Each due quarantine file moves through two independent steps:
//!
//! ```text
//! PendingRelease --(rename/copy to canonical name)--> FileRenamed
//!                --(archive promotion)---------------> DbPromoted
//! ```
//!
//! The steps are not transactional with each other. A failed file step does
//! not stop the archive step, and a failure on one file never stops the
//! next. The archive step never mutates an existing generation: it appends a
//! tombstone and a fresh canonical generation, then repoints the live row.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cpa_core::codec::{
    document_id_from_filename, extract_canonical_id, is_quarantine_file, PromotionTarget,
};
use cpa_core::effects::{remote_path, ArchiveEffects, FileStoreSession, PhysicalTimeEffects};
use cpa_core::{ArchiveId, CpaError, CpaResult, FileEntry};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::{ActivationFileMode, CpaSyncConfig};
use crate::quarantine::QuarantineScheduler;

/// Where a quarantine entry ended up after an activation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivationState {
    /// Nothing changed on the file store
    PendingRelease,
    /// The canonical file exists (renamed, or copied in copy mode)
    FileRenamed,
    /// The canonical file exists and the archive was promoted
    DbPromoted,
}

/// Result of the archive step for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Promotion {
    /// New generations appended and the live row repointed
    Promoted {
        /// Deleted copy of the quarantined generation
        tombstone: ArchiveId,
        /// Generation carrying the canonical id
        generation: ArchiveId,
    },
    /// The raw id has no archive history, or was already promoted
    NothingToPromote,
}

/// Outcome of activating a single quarantine file
#[derive(Debug, Clone, Serialize)]
pub struct ActivationOutcome {
    /// Quarantine filename
    pub filename: String,
    /// Canonical document id, when the filename could be parsed
    pub canonical_id: Option<String>,
    /// Whether the canonical file was produced
    pub file_activated: bool,
    /// Archive step result, `None` if it failed or never ran
    pub promotion: Option<Promotion>,
    /// Failures of either step
    pub errors: Vec<CpaError>,
}

impl ActivationOutcome {
    fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            canonical_id: None,
            file_activated: false,
            promotion: None,
            errors: Vec::new(),
        }
    }

    /// State the entry reached
    pub fn state(&self) -> ActivationState {
        match (self.file_activated, self.promotion) {
            (true, Some(Promotion::Promoted { .. })) => ActivationState::DbPromoted,
            (true, _) => ActivationState::FileRenamed,
            (false, _) => ActivationState::PendingRelease,
        }
    }

    /// Whether exactly one of the two steps succeeded
    pub fn is_inconsistent(&self) -> bool {
        self.file_activated != self.promotion.is_some()
    }
}

/// Outcome of one activation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivationReport {
    /// Quarantine files removed because their raw id was already promoted
    pub purged: Vec<String>,
    /// Promoted quarantine files whose canonical copy was missing and was
    /// copied again instead of being removed
    pub recopied: Vec<String>,
    /// One outcome per due quarantine file
    pub outcomes: Vec<ActivationOutcome>,
    /// Quarantined generations left in the archive after the run
    pub quarantined_remaining: Option<u64>,
}

impl ActivationReport {
    /// Entries that reached [`ActivationState::DbPromoted`]
    pub fn promoted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state() == ActivationState::DbPromoted)
            .count()
    }

    /// Entries with at least one failed step
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.errors.is_empty()).count()
    }
}

/// Reference token stamped on a promoted generation:
/// `yyyyMMddHHmm` in `timezone`, a dot, then `actor`
pub fn reference_token(now: DateTime<Utc>, timezone: Tz, actor: &str) -> String {
    format!(
        "{}.{}",
        now.with_timezone(&timezone).format("%Y%m%d%H%M"),
        actor
    )
}

/// Activates due quarantine files within an open session
pub struct Activator<'a, A: ?Sized, C: ?Sized> {
    archive: &'a A,
    clock: &'a C,
    config: &'a CpaSyncConfig,
    scheduler: QuarantineScheduler,
}

impl<'a, A, C> Activator<'a, A, C>
where
    A: ArchiveEffects + ?Sized,
    C: PhysicalTimeEffects + ?Sized,
{
    /// Create an activator for `config`'s directory, zone and policy
    pub fn new(archive: &'a A, clock: &'a C, config: &'a CpaSyncConfig) -> Self {
        Self {
            archive,
            clock,
            config,
            scheduler: QuarantineScheduler::new(config.timezone, config.due_policy),
        }
    }

    /// Activate every due quarantine file in the configured directory.
    ///
    /// Only listing failures abort the run; per-file failures are logged
    /// and recorded in the report.
    pub async fn run<S: FileStoreSession>(&self, session: &S) -> CpaResult<ActivationReport> {
        let directory = self.config.directory.as_str();
        let mut report = ActivationReport::default();

        if self.config.activation_file_mode == ActivationFileMode::Copy {
            let listed = session.list(directory).await?;
            let (purged, recopied) = self.purge_promoted(session, &listed).await;
            report.purged = purged;
            report.recopied = recopied;
        }

        let entries = session.list(directory).await?;
        let now = self.clock.now();
        for entry in self.scheduler.due_entries(&entries, now) {
            report
                .outcomes
                .push(self.activate(session, &entry.filename, now).await);
        }

        report.quarantined_remaining = match self.archive.count_quarantined().await {
            Ok(count) => {
                info!(count, "Quarantined CPAs remaining in archive");
                Some(count)
            }
            Err(err) => {
                warn!(error = %err, "Failed to count quarantined CPAs");
                None
            }
        };
        Ok(report)
    }

    /// Run both steps for one quarantine file.
    ///
    /// The file step only needs the canonical name; the archive step also
    /// needs the raw id and is skipped when it cannot be derived.
    pub async fn activate<S: FileStoreSession>(
        &self,
        session: &S,
        filename: &str,
        now: DateTime<Utc>,
    ) -> ActivationOutcome {
        let mut outcome = ActivationOutcome::new(filename);
        let canonical_filename = match extract_canonical_id(filename) {
            Ok(canonical_filename) => canonical_filename,
            Err(err) => {
                warn!(filename, error = %err, "Cannot derive CPA id from quarantine filename");
                outcome.errors.push(err);
                return outcome;
            }
        };
        outcome.canonical_id = Some(document_id_from_filename(&canonical_filename));

        match self.activate_file(session, filename, &canonical_filename).await {
            Ok(()) => outcome.file_activated = true,
            Err(err) => {
                error!(
                    filename,
                    canonical = %canonical_filename,
                    error = %err,
                    "Failed to activate quarantine file"
                );
                outcome.errors.push(err);
            }
        }

        match PromotionTarget::from_quarantine_filename(filename) {
            Ok(target) => match self.promote(&target, now).await {
                Ok(promotion) => outcome.promotion = Some(promotion),
                Err(err) => {
                    error!(
                        raw_id = %target.raw_id,
                        canonical_id = %target.canonical_id,
                        fatal = err.is_fatal_for_run(),
                        error = %err,
                        "Failed to promote quarantined CPA"
                    );
                    outcome.errors.push(err);
                }
            },
            Err(err) => {
                warn!(filename, error = %err, "No quarantined id in filename, archive not promoted");
                outcome.errors.push(err);
            }
        }

        if outcome.is_inconsistent() {
            warn!(
                filename,
                state = ?outcome.state(),
                "File store and archive disagree after activation"
            );
        }
        outcome
    }

    async fn activate_file<S: FileStoreSession>(
        &self,
        session: &S,
        quarantine_filename: &str,
        canonical_filename: &str,
    ) -> CpaResult<()> {
        let directory = self.config.directory.as_str();
        let from = remote_path(directory, quarantine_filename);
        let to = remote_path(directory, canonical_filename);
        match self.config.activation_file_mode {
            ActivationFileMode::Rename => {
                session.rename(&from, &to).await?;
                info!(from = %from, to = %to, "Activated quarantine file");
            }
            ActivationFileMode::Copy => {
                session.copy(&from, &to).await?;
                info!(from = %from, to = %to, "Copied quarantine file to active name");
            }
        }
        Ok(())
    }

    /// Archive step: tombstone the quarantined generation, append a
    /// canonical generation, repoint the live row and drop the raw live row.
    ///
    /// A raw id whose newest generation is already deleted was promoted by
    /// an earlier run and is left alone.
    pub async fn promote(
        &self,
        target: &PromotionTarget,
        now: DateTime<Utc>,
    ) -> CpaResult<Promotion> {
        info!(
            raw_id = %target.raw_id,
            canonical_id = %target.canonical_id,
            "Activating quarantined CPA"
        );
        let Some(latest) = self.archive.find_latest_by_document_id(&target.raw_id).await? else {
            info!(raw_id = %target.raw_id, "No archived generation for quarantined CPA");
            return Ok(Promotion::NothingToPromote);
        };
        if latest.deleted {
            info!(
                raw_id = %target.raw_id,
                archive_id = %latest.id,
                "Quarantined CPA already promoted"
            );
            return Ok(Promotion::NothingToPromote);
        }

        let tombstone = self.archive.insert_copy_of(latest.id).await?;
        self.archive.mark_deleted(tombstone).await?;
        debug!(archive_id = %tombstone, "Tombstoned quarantined generation");

        let generation = self.archive.insert_copy_of(latest.id).await?;
        let token = reference_token(now, self.config.timezone, &self.config.promotion_actor);
        self.archive
            .restamp_as_new(generation, &target.canonical_id, &token)
            .await?;
        debug!(archive_id = %generation, token = %token, "Stamped canonical generation");

        let updated = self
            .archive
            .propagate_to_live(&target.canonical_id, generation)
            .await?;
        if updated == 0 {
            return Err(CpaError::live_record_missing(target.canonical_id.clone()));
        }

        let removed = self
            .archive
            .delete_live_by_document_id(&target.raw_id)
            .await?;
        info!(
            canonical_id = %target.canonical_id,
            archive_id = %generation,
            raw_live_rows_removed = removed,
            "Promoted quarantined CPA"
        );
        Ok(Promotion::Promoted {
            tombstone,
            generation,
        })
    }

    /// Copy mode: remove quarantine files whose raw id is already promoted.
    ///
    /// A quarantine file is only removed when its canonical copy is in
    /// `listed`; otherwise it is still the only copy of the document and is
    /// copied again instead. Returns `(purged, recopied)` filenames.
    async fn purge_promoted<S: FileStoreSession>(
        &self,
        session: &S,
        listed: &[FileEntry],
    ) -> (Vec<String>, Vec<String>) {
        let directory = self.config.directory.as_str();
        let present: HashSet<&str> = listed.iter().map(|e| e.filename.as_str()).collect();
        let mut purged = Vec::new();
        let mut recopied = Vec::new();
        for entry in listed {
            if !is_quarantine_file(&entry.filename) {
                continue;
            }
            let Ok(target) = PromotionTarget::from_quarantine_filename(&entry.filename) else {
                continue;
            };
            let promoted = match self.archive.find_latest_by_document_id(&target.raw_id).await {
                Ok(latest) => latest.is_some_and(|record| record.deleted),
                Err(err) => {
                    warn!(filename = %entry.filename, error = %err, "Failed to look up quarantined CPA");
                    continue;
                }
            };
            if !promoted {
                continue;
            }

            if !present.contains(target.canonical_filename.as_str()) {
                warn!(
                    filename = %entry.filename,
                    canonical = %target.canonical_filename,
                    "Promoted CPA has no active file, copying again"
                );
                match self
                    .activate_file(session, &entry.filename, &target.canonical_filename)
                    .await
                {
                    Ok(()) => recopied.push(entry.filename.clone()),
                    Err(err) => {
                        error!(filename = %entry.filename, error = %err, "Failed to copy promoted quarantine file");
                    }
                }
                continue;
            }

            match session.remove(&remote_path(directory, &entry.filename)).await {
                Ok(()) => {
                    info!(filename = %entry.filename, "Removed promoted quarantine file");
                    purged.push(entry.filename.clone());
                }
                Err(err) => {
                    warn!(filename = %entry.filename, error = %err, "Failed to remove promoted quarantine file");
                }
            }
        }
        (purged, recopied)
    }
}
