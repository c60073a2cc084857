//! `due`: quarantine files ready for activation

use anyhow::{Context, Result};
use cpa_core::effects::{FileStoreEffects, FileStoreSession, PhysicalTimeEffects};
use cpa_effects::LocalFileStoreHandler;
use cpa_sync::{CpaSyncConfig, QuarantineScheduler};
use std::fmt::Write;
use std::path::Path;

use super::ROOT_DIRECTORY;

/// Names of the quarantine files in `root` due at the clock's current time
pub async fn run<C: PhysicalTimeEffects>(root: &Path, config: &CpaSyncConfig, clock: &C) -> Result<String> {
    let store = LocalFileStoreHandler::new(root);
    let session = store
        .connect()
        .await
        .with_context(|| format!("opening {}", root.display()))?;
    let listed = session.list(ROOT_DIRECTORY).await;
    session.close().await?;
    let entries = listed?;

    let scheduler = QuarantineScheduler::new(config.timezone, config.due_policy);
    let mut out = String::new();
    for entry in scheduler.due_entries(&entries, clock.now()) {
        writeln!(out, "{}", entry.filename)?;
    }
    Ok(out)
}
