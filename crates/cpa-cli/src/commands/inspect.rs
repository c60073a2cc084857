//! `inspect`: decode a quarantine filename

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cpa_core::codec::{is_quarantine_file, parse_release_fields, PromotionTarget};
use cpa_core::effects::PhysicalTimeEffects;
use cpa_sync::{CpaSyncConfig, QuarantineScheduler};
use std::fmt::Write;

/// Describe `filename` as of the clock's current time
pub fn run<C: PhysicalTimeEffects>(filename: &str, config: &CpaSyncConfig, clock: &C) -> Result<String> {
    describe(filename, config, clock.now())
}

/// Release fields, both ids and due status of `filename` at `now`
pub fn describe(filename: &str, config: &CpaSyncConfig, now: DateTime<Utc>) -> Result<String> {
    let fields = parse_release_fields(filename).context("reading release fields")?;
    let target = PromotionTarget::from_quarantine_filename(filename).context("deriving CPA ids")?;
    let scheduler = QuarantineScheduler::new(config.timezone, config.due_policy);
    let due = is_quarantine_file(filename) && scheduler.is_due(filename, now);

    let mut out = String::new();
    writeln!(
        out,
        "release:        {:02}-{:02} {:02}:{:02} ({})",
        fields.month, fields.day, fields.hour, fields.minute, config.timezone
    )?;
    writeln!(out, "canonical file: {}", target.canonical_filename)?;
    writeln!(out, "canonical id:   {}", target.canonical_id)?;
    writeln!(out, "raw id:         {}", target.raw_id)?;
    if !is_quarantine_file(filename) {
        writeln!(out, "due:            no (not a quarantine file)")?;
    } else {
        writeln!(out, "due:            {}", if due { "yes" } else { "no" })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpa_testkit::fixtures::local_instant;

    const NAME: &str = "06140800_nav.60120._R_Zm9ybnllbHNl._R_.qrntn";

    #[test]
    fn test_describe_due_file() {
        let out = describe(NAME, &CpaSyncConfig::default(), local_instant(2025, 6, 14, 9, 0)).unwrap();
        assert!(out.contains("06-14 08:00 (Europe/Oslo)"));
        assert!(out.contains("canonical file: nav.60120.xml"));
        assert!(out.contains("canonical id:   nav:60120"));
        assert!(out.contains("raw id:         06140800_nav:60120"));
        assert!(out.contains("due:            yes"));
    }

    #[test]
    fn test_describe_not_due() {
        let out = describe(NAME, &CpaSyncConfig::default(), local_instant(2025, 6, 13, 9, 0)).unwrap();
        assert!(out.contains("due:            no"));
    }

    #[test]
    fn test_describe_rejects_malformed() {
        assert!(describe("nav.60120.xml", &CpaSyncConfig::default(), Utc::now()).is_err());
    }
}
