//! Shared wiring for the service-level tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use cpa_sync::{CpaSyncConfig, CpaSyncService};
use cpa_testkit::fixtures::CPA_DIRECTORY;
use cpa_testkit::{FixedClock, MemoryArchive, MemoryFileStore, RecordingRepository};
use std::sync::Arc;

pub type TestService = CpaSyncService<MemoryFileStore, RecordingRepository, MemoryArchive, FixedClock>;

pub struct Harness {
    pub store: MemoryFileStore,
    pub repository: RecordingRepository,
    pub archive: MemoryArchive,
    pub clock: FixedClock,
    pub service: Arc<TestService>,
}

pub fn config() -> CpaSyncConfig {
    CpaSyncConfig::default().with_directory(CPA_DIRECTORY)
}

pub fn harness(config: CpaSyncConfig, now: DateTime<Utc>) -> Harness {
    harness_with(config, now, MemoryFileStore::new(), RecordingRepository::new())
}

pub fn harness_with(
    config: CpaSyncConfig,
    now: DateTime<Utc>,
    store: MemoryFileStore,
    repository: RecordingRepository,
) -> Harness {
    let archive = MemoryArchive::new();
    let clock = FixedClock::new(now);
    let service = CpaSyncService::new(
        config,
        Arc::new(store.clone()),
        Arc::new(repository.clone()),
        Arc::new(archive.clone()),
        Arc::new(clock.clone()),
    )
    .unwrap();
    Harness {
        store,
        repository,
        archive,
        clock,
        service: Arc::new(service),
    }
}
