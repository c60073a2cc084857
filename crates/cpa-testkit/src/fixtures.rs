//! Documents, filenames and archive fields for tests

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use cpa_core::PartnerFields;

/// Zone quarantine release fields are written in
pub const RELEASE_ZONE: Tz = chrono_tz::Europe::Oslo;

/// Directory the fixtures place files in
pub const CPA_DIRECTORY: &str = "/outbound/cpa";

/// Minimal CPA document carrying `cpa_id`
pub fn cpa_document(cpa_id: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<tns:CollaborationProtocolAgreement xmlns:tns="http://www.oasis-open.org/committees/ebxml-cppa/schema/cpp-cpa-2_0.xsd" "#,
            r#"tns:cpaid="{0}"><tns:Status tns:value="agreed"/></tns:CollaborationProtocolAgreement>"#
        ),
        cpa_id
    )
}

/// Path of `filename` under [`CPA_DIRECTORY`]
pub fn cpa_path(filename: &str) -> String {
    format!("{CPA_DIRECTORY}/{filename}")
}

/// Instant for a local wall-clock time in [`RELEASE_ZONE`]
pub fn local_instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    RELEASE_ZONE
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap())
}

/// Quarantine filename releasing `canonical_filename` (`nav.60120.xml`) at
/// `release`, as written by the intake service
pub fn quarantine_filename(release: DateTime<Utc>, canonical_filename: &str) -> String {
    let stem = canonical_filename
        .strip_suffix(".xml")
        .unwrap_or(canonical_filename);
    format!(
        "{}_{stem}._R_Zm9ybnllbHNl._R_.qrntn",
        release.with_timezone(&RELEASE_ZONE).format("%m%d%H%M")
    )
}

/// Raw document id of a quarantine filename (`01230800_nav:60120`)
pub fn raw_id(quarantine_filename: &str) -> String {
    let end = quarantine_filename
        .find("._R_")
        .unwrap_or(quarantine_filename.len());
    quarantine_filename[..end].replace('.', ":")
}

/// Partner fields for `partner_id`
pub fn partner(partner_id: &str) -> PartnerFields {
    PartnerFields {
        partner_id: partner_id.to_string(),
        nav_cpp_id: "nav:qass:35065".to_string(),
        partner_subject_dn: format!("CN={partner_id}, O=Partner AS, C=NO"),
        partner_endpoint: format!("https://{partner_id}.example.no/ebms"),
        mail_receiver: None,
        reason: Some("scheduled renewal".to_string()),
        created_by: "intake".to_string(),
        valid_from: None,
        valid_to: None,
    }
}
