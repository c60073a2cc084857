//! `inventory`: what a sync run would see in a directory

use anyhow::{Context, Result};
use cpa_core::effects::{FileStoreEffects, FileStoreSession};
use cpa_effects::LocalFileStoreHandler;
use cpa_sync::inventory::format_timestamp;
use cpa_sync::{build_inventory, Inventory};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

use super::ROOT_DIRECTORY;

#[derive(Debug, Serialize)]
struct InventoryLine<'a> {
    document_id: &'a str,
    timestamp: String,
}

/// Build the inventory of `root` and render it
pub async fn run(root: &Path, json: bool) -> Result<String> {
    let store = LocalFileStoreHandler::new(root);
    let session = store
        .connect()
        .await
        .with_context(|| format!("opening {}", root.display()))?;
    let result = build_inventory(&session, ROOT_DIRECTORY).await;
    session.close().await?;
    render(&result?, json)
}

fn render(inventory: &Inventory, json: bool) -> Result<String> {
    let lines: Vec<_> = inventory
        .values()
        .map(|entry| InventoryLine {
            document_id: &entry.document_id,
            timestamp: format_timestamp(entry.timestamp),
        })
        .collect();

    if json {
        let mut out = serde_json::to_string_pretty(&lines)?;
        out.push('\n');
        return Ok(out);
    }
    let mut out = String::new();
    for line in lines {
        writeln!(out, "{}  {}", line.document_id, line.timestamp)?;
    }
    Ok(out)
}
