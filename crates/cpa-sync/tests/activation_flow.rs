//! Quarantine activation: file step, archive promotion, copy-mode purge

#![allow(clippy::unwrap_used)]

mod common;

use assert_matches::assert_matches;
use common::{config, harness, Harness};
use cpa_core::CpaError;
use cpa_sync::{ActivationFileMode, ActivationState, Promotion};
use cpa_testkit::fixtures::{cpa_document, cpa_path, local_instant, partner, quarantine_filename, raw_id};
use cpa_testkit::{ArchiveOp, FileOp};

const CANONICAL_ID: &str = "nav:60120";
const CANONICAL_FILE: &str = "nav.60120.xml";

/// Due quarantine file for `nav:60120` with archive history and both live rows
fn seeded(mode: ActivationFileMode) -> (Harness, String) {
    let h = harness(
        config().with_activation_file_mode(mode),
        local_instant(2025, 6, 14, 12, 30),
    );
    let name = quarantine_filename(local_instant(2025, 6, 14, 8, 0), CANONICAL_FILE);
    h.store
        .insert_file(&cpa_path(&name), cpa_document(CANONICAL_ID), 1_735_689_600);
    h.archive
        .seed_quarantined(&raw_id(&name), partner("renewed"), local_instant(2025, 6, 1, 9, 0));
    h.archive.seed_live(CANONICAL_ID, partner("current"));
    (h, name)
}

#[tokio::test]
async fn test_promotion_appends_generations_and_repoints_live() {
    let (h, name) = seeded(ActivationFileMode::Rename);
    let raw = raw_id(&name);

    let report = h.service.activate_pending().await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state(), ActivationState::DbPromoted);
    assert!(outcome.errors.is_empty());
    assert_eq!(report.promoted_count(), 1);

    assert!(h.store.exists(&cpa_path(CANONICAL_FILE)));
    assert!(!h.store.exists(&cpa_path(&name)));

    let raw_rows = h.archive.rows_for(&raw);
    assert_eq!(raw_rows.len(), 2);
    assert!(!raw_rows[0].deleted, "quarantined generation is never mutated");
    assert!(raw_rows[0].quarantined);
    assert!(raw_rows[1].deleted);
    assert_eq!(raw_rows[1].partner, raw_rows[0].partner);

    let canonical_rows = h.archive.rows_for(CANONICAL_ID);
    assert_eq!(canonical_rows.len(), 1);
    let generation = &canonical_rows[0];
    assert!(!generation.quarantined && !generation.deleted);
    assert_eq!(generation.partner_reference_id, "202506141230.cpa-aktivering");
    assert_eq!(generation.mottak_reference_id, "202506141230.cpa-aktivering");
    assert_eq!(generation.partner, partner("renewed"));
    assert!(raw_rows[1].id < generation.id);
    assert_eq!(
        outcome.promotion,
        Some(Promotion::Promoted {
            tombstone: raw_rows[1].id,
            generation: generation.id
        })
    );

    let live = h.archive.live(CANONICAL_ID).unwrap();
    assert_eq!(live.partner, partner("renewed"));
    assert_eq!(live.partner_reference_id, "202506141230.cpa-aktivering");
    assert!(h.archive.live(&raw).is_none());

    assert_eq!(
        h.archive.calls(),
        vec![
            ArchiveOp::FindLatest,
            ArchiveOp::InsertCopy,
            ArchiveOp::MarkDeleted,
            ArchiveOp::InsertCopy,
            ArchiveOp::Restamp,
            ArchiveOp::PropagateToLive,
            ArchiveOp::DeleteLive,
            ArchiveOp::CountQuarantined,
        ]
    );
    assert_eq!(report.quarantined_remaining, Some(2));
    assert_eq!(h.store.open_sessions(), 0);
}

#[tokio::test]
async fn test_not_yet_due_file_is_left_alone() {
    let (h, name) = seeded(ActivationFileMode::Rename);
    h.clock.set(local_instant(2025, 6, 14, 7, 59));

    let report = h.service.activate_pending().await.unwrap();

    assert!(report.outcomes.is_empty());
    assert!(h.store.exists(&cpa_path(&name)));
    assert_eq!(h.archive.calls(), vec![ArchiveOp::CountQuarantined]);
}

#[tokio::test]
async fn test_file_failure_does_not_block_promotion() {
    let (h, name) = seeded(ActivationFileMode::Rename);
    h.store.fail_on(
        FileOp::Rename,
        &cpa_path(&name),
        CpaError::file_store_code(3, "Permission denied"),
    );

    let report = h.service.activate_pending().await.unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state(), ActivationState::PendingRelease);
    assert!(outcome.is_inconsistent());
    assert_matches!(outcome.promotion, Some(Promotion::Promoted { .. }));
    assert_matches!(&outcome.errors[..], [CpaError::FileStore { code: Some(3), .. }]);
    assert!(h.store.exists(&cpa_path(&name)));
    assert_eq!(h.archive.rows_for(CANONICAL_ID).len(), 1);
}

#[tokio::test]
async fn test_missing_live_record_keeps_raw_live_row() {
    let h = harness(config(), local_instant(2025, 6, 14, 12, 30));
    let name = quarantine_filename(local_instant(2025, 6, 14, 8, 0), CANONICAL_FILE);
    let raw = raw_id(&name);
    h.store
        .insert_file(&cpa_path(&name), cpa_document(CANONICAL_ID), 1_735_689_600);
    h.archive
        .seed_quarantined(&raw, partner("renewed"), local_instant(2025, 6, 1, 9, 0));

    let report = h.service.activate_pending().await.unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state(), ActivationState::FileRenamed);
    assert_matches!(
        &outcome.errors[..],
        [CpaError::LiveRecordMissing { document_id }] if document_id == CANONICAL_ID
    );
    assert!(h.archive.live(&raw).is_some());
    assert!(!h.archive.calls().contains(&ArchiveOp::DeleteLive));
    assert_eq!(h.archive.rows().len(), 3);
}

#[tokio::test]
async fn test_already_promoted_raw_id_is_not_promoted_again() {
    let (h, name) = seeded(ActivationFileMode::Rename);
    h.archive.insert_generation(
        &raw_id(&name),
        true,
        true,
        partner("renewed"),
        local_instant(2025, 6, 2, 9, 0),
    );

    let report = h.service.activate_pending().await.unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.promotion, Some(Promotion::NothingToPromote));
    assert_eq!(outcome.state(), ActivationState::FileRenamed);
    assert!(h.archive.rows_for(CANONICAL_ID).is_empty());
    assert!(!h.archive.calls().contains(&ArchiveOp::InsertCopy));
}

#[tokio::test]
async fn test_no_archive_history_still_activates_file() {
    let h = harness(config(), local_instant(2025, 6, 14, 12, 30));
    let name = quarantine_filename(local_instant(2025, 6, 14, 8, 0), CANONICAL_FILE);
    h.store
        .insert_file(&cpa_path(&name), cpa_document(CANONICAL_ID), 1_735_689_600);

    let report = h.service.activate_pending().await.unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.promotion, Some(Promotion::NothingToPromote));
    assert!(!outcome.is_inconsistent());
    assert!(h.store.exists(&cpa_path(CANONICAL_FILE)));
    assert!(h.archive.rows().is_empty());
}

#[tokio::test]
async fn test_one_failed_file_does_not_stop_the_next() {
    let (h, first) = seeded(ActivationFileMode::Rename);
    let second = quarantine_filename(local_instant(2025, 6, 14, 9, 0), "nav.70000.xml");
    h.store
        .insert_file(&cpa_path(&second), cpa_document("nav:70000"), 1_735_689_600);
    h.archive
        .seed_quarantined(&raw_id(&second), partner("other"), local_instant(2025, 6, 1, 9, 0));
    h.archive.seed_live("nav:70000", partner("old"));
    h.store
        .fail_on(FileOp::Rename, &cpa_path(&first), CpaError::file_store_code(4, "Failure"));

    let report = h.service.activate_pending().await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.promoted_count(), 1);
    assert!(h.store.exists(&cpa_path("nav.70000.xml")));
    assert_eq!(h.archive.live("nav:70000").unwrap().partner, partner("other"));
}

#[tokio::test]
async fn test_malformed_quarantine_names_are_ignored() {
    let h = harness(config(), local_instant(2025, 6, 14, 12, 30));
    h.store
        .insert_file(&cpa_path("0614080_nav.1._R_x._R_.qrntn"), cpa_document("nav:1"), 0);
    h.store
        .insert_file(&cpa_path("06140800-nav.1._R_x._R_.qrntn"), cpa_document("nav:1"), 0);

    let report = h.service.activate_pending().await.unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(h.store.filenames("/outbound/cpa").len(), 2);
}

#[tokio::test]
async fn test_copy_mode_keeps_quarantine_file_until_purged() {
    let (h, name) = seeded(ActivationFileMode::Copy);

    let first = h.service.activate_pending().await.unwrap();
    assert_eq!(first.promoted_count(), 1);
    assert!(first.purged.is_empty());
    assert!(h.store.exists(&cpa_path(&name)));
    assert!(h.store.exists(&cpa_path(CANONICAL_FILE)));
    let rows_after_first = h.archive.rows().len();

    let second = h.service.activate_pending().await.unwrap();
    assert_eq!(second.purged, vec![name.clone()]);
    assert!(second.outcomes.is_empty());
    assert!(!h.store.exists(&cpa_path(&name)));
    assert!(h.store.exists(&cpa_path(CANONICAL_FILE)));
    assert_eq!(h.archive.rows().len(), rows_after_first);
}

#[tokio::test]
async fn test_copy_mode_recopies_instead_of_purging_when_active_file_missing() {
    let (h, name) = seeded(ActivationFileMode::Copy);
    h.store.fail_on(
        FileOp::Copy,
        &cpa_path(&name),
        CpaError::file_store_code(4, "Failure"),
    );

    let first = h.service.activate_pending().await.unwrap();
    assert_eq!(first.outcomes[0].state(), ActivationState::PendingRelease);
    assert_matches!(first.outcomes[0].promotion, Some(Promotion::Promoted { .. }));
    assert!(!h.store.exists(&cpa_path(CANONICAL_FILE)));

    h.store.clear_failures();
    let second = h.service.activate_pending().await.unwrap();
    assert!(second.purged.is_empty());
    assert_eq!(second.recopied, vec![name.clone()]);
    assert!(h.store.exists(&cpa_path(&name)));
    assert_eq!(
        h.store.file(&cpa_path(CANONICAL_FILE)),
        Some(cpa_document(CANONICAL_ID).into_bytes())
    );

    let third = h.service.activate_pending().await.unwrap();
    assert_eq!(third.purged, vec![name.clone()]);
    assert!(third.recopied.is_empty());
    assert!(!h.store.exists(&cpa_path(&name)));
    assert!(h.store.exists(&cpa_path(CANONICAL_FILE)));
}

#[tokio::test]
async fn test_name_without_payload_marker_still_activates_file() {
    let h = harness(config(), local_instant(2025, 6, 14, 12, 30));
    let name = "06140800_nav.60120_Zm9ybnllbHNl.qrntn";
    h.store
        .insert_file(&cpa_path(name), cpa_document(CANONICAL_ID), 1_735_689_600);

    let report = h.service.activate_pending().await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert!(outcome.file_activated);
    assert_eq!(outcome.canonical_id.as_deref(), Some(CANONICAL_ID));
    assert_eq!(outcome.promotion, None);
    assert_matches!(&outcome.errors[..], [CpaError::MalformedFilename { .. }]);
    assert!(h.store.exists(&cpa_path(CANONICAL_FILE)));
    assert!(!h.store.exists(&cpa_path(name)));
    assert!(!h.archive.calls().contains(&ArchiveOp::FindLatest));
}

#[tokio::test]
async fn test_listing_failure_aborts_activation() {
    let h = harness(config(), local_instant(2025, 6, 14, 12, 30));
    h.store
        .fail_on(FileOp::List, "/outbound/cpa", CpaError::file_store_code(4, "Failure"));

    assert_matches!(
        h.service.activate_pending().await,
        Err(CpaError::FileStore { code: Some(4), .. })
    );
    assert_eq!(h.store.open_sessions(), 0);
}
