//! Quarantine scheduler
//!
//! Decides which quarantine files are due for activation. Release fields
//! carry no year and are read in one fixed zone; all comparisons happen in
//! that zone, never in UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use cpa_core::codec::filename::{is_quarantine_file, parse_release_fields, ReleaseFields};
use cpa_core::{CpaError, CpaResult, FileEntry};
use tracing::{info, warn};

use crate::config::DuePolicy;

/// Due-date evaluation for quarantine filenames
#[derive(Debug, Clone, Copy)]
pub struct QuarantineScheduler {
    timezone: Tz,
    policy: DuePolicy,
}

impl QuarantineScheduler {
    /// Create a scheduler evaluating release fields in `timezone`
    pub fn new(timezone: Tz, policy: DuePolicy) -> Self {
        Self { timezone, policy }
    }

    /// Zone release fields are read in
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Whether `filename`'s release moment has passed at `now`.
    ///
    /// Malformed filenames are never due; the failure is logged.
    pub fn is_due(&self, filename: &str, now: DateTime<Utc>) -> bool {
        let fields = match parse_release_fields(filename) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(filename, error = %err, "Quarantine file has no valid release time");
                return false;
            }
        };
        match self.evaluate(fields, now) {
            Ok(due) => due,
            Err(err) => {
                warn!(filename, error = %err, "Quarantine file has no valid release time");
                false
            }
        }
    }

    /// Quarantine entries due at `now`, in listing order.
    ///
    /// Every quarantine-suffixed entry is logged whether due or not, so names
    /// that will never activate stay visible.
    pub fn due_entries<'a>(&self, entries: &'a [FileEntry], now: DateTime<Utc>) -> Vec<&'a FileEntry> {
        entries
            .iter()
            .filter(|entry| is_quarantine_file(&entry.filename))
            .filter(|entry| {
                let due = self.is_due(&entry.filename, now);
                if due {
                    info!(filename = %entry.filename, "Quarantine file is due to be activated");
                } else {
                    info!(filename = %entry.filename, "Quarantine file is not yet due to be activated");
                }
                due
            })
            .collect()
    }

    fn evaluate(&self, fields: ReleaseFields, now: DateTime<Utc>) -> CpaResult<bool> {
        let local = now.with_timezone(&self.timezone);
        match self.policy {
            DuePolicy::ExactDay => {
                if fields.month != local.month() || fields.day != local.day() {
                    return Ok(false);
                }
                let scheduled = release_time(fields)?;
                let current = NaiveTime::from_hms_opt(local.hour(), local.minute(), 1)
                    .ok_or_else(|| CpaError::internal("local time out of range"))?;
                Ok(current >= scheduled)
            }
            DuePolicy::MonthRollover => {
                let current_month = local.month();
                if fields.month != current_month {
                    let (year, previous_month) = if current_month == 1 {
                        (local.year() - 1, 12)
                    } else {
                        (local.year(), current_month - 1)
                    };
                    if fields.month != previous_month {
                        return Ok(false);
                    }
                    release_date(year, fields)?;
                    release_time(fields)?;
                    return Ok(true);
                }
                let scheduled = release_date(local.year(), fields)?.and_time(release_time(fields)?);
                Ok(scheduled <= local.naive_local())
            }
        }
    }
}

fn release_time(fields: ReleaseFields) -> CpaResult<NaiveTime> {
    NaiveTime::from_hms_opt(fields.hour, fields.minute, 0).ok_or_else(|| {
        CpaError::invalid(format!(
            "release time {:02}:{:02} out of range",
            fields.hour, fields.minute
        ))
    })
}

fn release_date(year: i32, fields: ReleaseFields) -> CpaResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, fields.month, fields.day).ok_or_else(|| {
        CpaError::invalid(format!(
            "release date {year}-{:02}-{:02} does not exist",
            fields.month, fields.day
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const OSLO: Tz = chrono_tz::Europe::Oslo;
    const TAIL: &str = "_nav.60120._R_Zm9ybnllbHNl._R_.qrntn";

    fn at_local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        OSLO.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn name_for(local: DateTime<Utc>) -> String {
        format!("{}{TAIL}", local.with_timezone(&OSLO).format("%m%d%H%M"))
    }

    #[test]
    fn test_exact_day_due_now_and_past() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::ExactDay);
        let now = at_local(2025, 6, 14, 12, 30, 0);

        assert!(scheduler.is_due(&name_for(now), now));
        assert!(scheduler.is_due(&name_for(now - Duration::minutes(5)), now));
        assert!(!scheduler.is_due(&name_for(now + Duration::minutes(5)), now));
    }

    #[test]
    fn test_exact_day_other_days_never_due() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::ExactDay);
        let now = at_local(2025, 6, 14, 12, 30, 0);

        assert!(!scheduler.is_due(&name_for(now - Duration::days(1)), now));
        assert!(!scheduler.is_due(&name_for(now + Duration::days(1)), now));
        assert!(!scheduler.is_due(&name_for(now - Duration::days(30)), now));
    }

    #[test]
    fn test_exact_day_uses_local_zone() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::ExactDay);
        // 23:30 UTC on June 14th is already June 15th 01:30 in Oslo
        let now = Utc.with_ymd_and_hms(2025, 6, 14, 23, 30, 0).single().unwrap();

        assert!(scheduler.is_due(&format!("06150100{TAIL}"), now));
        assert!(!scheduler.is_due(&format!("06142300{TAIL}"), now));
    }

    #[test]
    fn test_exact_day_minute_boundary() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::ExactDay);
        let name = format!("06141230{TAIL}");

        assert!(scheduler.is_due(&name, at_local(2025, 6, 14, 12, 30, 0)));
        assert!(!scheduler.is_due(&name, at_local(2025, 6, 14, 12, 29, 59)));
    }

    #[test]
    fn test_malformed_names_never_due() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::ExactDay);
        let now = at_local(2025, 1, 27, 9, 0, 0);

        for name in [
            format!("0127080{TAIL}"),
            format!("0127080000{TAIL}"),
            "01270800-nav.60120._R_Zm9ybnllbHNl._R_.qrntn".to_string(),
            "01270800".to_string(),
            format!("0127080X{TAIL}"),
            format!("X1270800{TAIL}"),
            format!("01272500{TAIL}"),
        ] {
            assert!(!scheduler.is_due(&name, now), "{name}");
        }
    }

    #[test]
    fn test_month_rollover_policy() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::MonthRollover);
        let now = at_local(2025, 6, 14, 12, 30, 0);

        // same month, earlier day: due (exact-day would skip it)
        assert!(scheduler.is_due(&format!("06020800{TAIL}"), now));
        // same month, later today or later day: not yet
        assert!(!scheduler.is_due(&format!("06141300{TAIL}"), now));
        assert!(!scheduler.is_due(&format!("06200800{TAIL}"), now));
        // previous month: late activation across the boundary
        assert!(scheduler.is_due(&format!("05310800{TAIL}"), now));
        // anything else is read as next year
        assert!(!scheduler.is_due(&format!("04100800{TAIL}"), now));
        assert!(!scheduler.is_due(&format!("07010800{TAIL}"), now));
        // nonexistent date
        assert!(!scheduler.is_due(&format!("06310800{TAIL}"), now));
    }

    #[test]
    fn test_month_rollover_across_year_end() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::MonthRollover);
        let now = at_local(2026, 1, 2, 9, 0, 0);

        assert!(scheduler.is_due(&format!("12310800{TAIL}"), now));
        assert!(!scheduler.is_due(&format!("11300800{TAIL}"), now));
    }

    #[test]
    fn test_due_entries_filters_suffix() {
        let scheduler = QuarantineScheduler::new(OSLO, DuePolicy::ExactDay);
        let now = at_local(2025, 6, 14, 12, 30, 0);
        let entries = vec![
            FileEntry::new(format!("06141200{TAIL}"), 0),
            FileEntry::new("06141200_nav.60120._R_Zm9ybnllbHNl._R_", 0),
            FileEntry::new("nav.60120.xml", 0),
            FileEntry::new(format!("06150800{TAIL}"), 0),
        ];
        let due = scheduler.due_entries(&entries, now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].filename, format!("06141200{TAIL}"));
    }
}
