//! Roundtrip serialisation tests for the persisted `feedmirror-core` records.
//!
//! Each `#[case]` is isolated; no shared state.

use chrono::{TimeZone, Utc};
use feedmirror_core::types::{
    CacheEntry, ChangeReason, Manifest, ManifestEntry, ManifestStatus, ResourceUrl, RunClock,
};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn minimal_entry() -> CacheEntry {
    CacheEntry {
        entity_tag: None,
        last_modified: None,
        byte_length: None,
        stored_length: None,
        content_hash: None,
        last_downloaded_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    }
}

fn full_entry() -> CacheEntry {
    CacheEntry {
        entity_tag: Some("W/\"5f3-18c2a\"".to_string()),
        last_modified: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        byte_length: Some(1523),
        stored_length: Some(1400),
        content_hash: Some("ab".repeat(32)),
        last_downloaded_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    }
}

fn manifest_entry(name: &str, status: ManifestStatus, reason: Option<ChangeReason>) -> ManifestEntry {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    ManifestEntry {
        name: name.to_string(),
        url: ResourceUrl::from(format!("https://cdn.example.com/{name}")),
        status,
        reason,
        error: match status {
            ManifestStatus::Failed => Some("HTTP status 503".to_string()),
            _ => None,
        },
        checked_at: now,
        downloaded_at: match status {
            ManifestStatus::Downloaded => Some(now),
            _ => None,
        },
    }
}

// ---------------------------------------------------------------------------
// Parameterised roundtrip tests
// ---------------------------------------------------------------------------

#[rstest]
#[case("minimal", minimal_entry())]
#[case("all_fields", full_entry())]
fn cache_entry_roundtrip(#[case] label: &str, #[case] entry: CacheEntry) {
    let json = serde_json::to_string_pretty(&entry)
        .unwrap_or_else(|e| panic!("[{label}] serialize failed: {e}"));
    let back: CacheEntry = serde_json::from_str(&json)
        .unwrap_or_else(|e| panic!("[{label}] deserialize failed: {e}"));
    assert_eq!(entry, back, "[{label}]");
}

#[rstest]
#[case(ManifestStatus::Downloaded, "\"downloaded\"")]
#[case(ManifestStatus::Skipped, "\"skipped\"")]
#[case(ManifestStatus::Failed, "\"failed\"")]
fn manifest_status_is_lowercase(#[case] status: ManifestStatus, #[case] expected: &str) {
    assert_eq!(serde_json::to_string(&status).expect("serialize"), expected);
}

#[test]
fn manifest_file_shape() {
    let manifest = Manifest::from_entries(
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 1).unwrap(),
        vec![
            manifest_entry("a.csv", ManifestStatus::Downloaded, Some(ChangeReason::NoLocalCopy)),
            manifest_entry("b.csv", ManifestStatus::Failed, Some(ChangeReason::EntityTagMismatch)),
            manifest_entry("c.csv", ManifestStatus::Skipped, Some(ChangeReason::NoChangeDetected)),
        ],
        false,
    );

    let value = serde_json::to_value(&manifest).expect("serialize");
    assert_eq!(value["totalFiles"], 3);
    assert!(value["lastUpdated"].is_string());
    assert_eq!(value["files"][0]["status"], "downloaded");
    assert!(value["files"][0]["downloadedAt"].is_string());
    assert_eq!(value["files"][1]["error"], "HTTP status 503");
    assert_eq!(value["files"][2]["reason"], "NoChangeDetected");
    assert!(value["files"][2].get("downloadedAt").is_none());

    let back: Manifest = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, manifest);
}

#[test]
fn run_clock_roundtrip() {
    let clock = RunClock::at(Utc.with_ymd_and_hms(2024, 2, 29, 13, 37, 0).unwrap());
    let value = serde_json::to_value(&clock).expect("serialize");
    assert_eq!(value["date"], "2024-02-29");
    assert_eq!(value["time"], "13:37:00");
    let back: RunClock = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, clock);
}
