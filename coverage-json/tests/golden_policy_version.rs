use std::fs;

use chrono::{TimeZone, Utc};
use coverage_core::{diff_policy_versions, CoverageError};
use coverage_json::{parse_policy_version, parse_policy_version_str};
use serde_json::{json, Value};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn version_diff_matches_golden() {
    let base_json = fs::read_to_string(fixture_path("policy_v3.json"))
        .expect("Không đọc được fixture phiên bản gốc");
    let target_json = fs::read_to_string(fixture_path("policy_v4.json"))
        .expect("Không đọc được fixture phiên bản đích");

    let base = parse_policy_version_str(&base_json).expect("Không đọc được phiên bản gốc");
    let target = parse_policy_version_str(&target_json).expect("Không đọc được phiên bản đích");

    let actual = serde_json::to_value(diff_policy_versions(&base, &target))
        .expect("Không serialize được kết quả so sánh");

    let expected = fs::read_to_string(fixture_path("policy_v3_v4_diff.json"))
        .expect("Không đọc được golden diff");
    let expected_value: Value = serde_json::from_str(&expected).expect("Golden không hợp lệ");

    assert_eq!(actual, expected_value);
}

#[test]
fn diff_rows_serialize_with_kind_tag() {
    let base = parse_policy_version(&json!({
        "version": 1,
        "coverage_map": { "x": "not_covered" },
    }))
    .expect("Không đọc được envelope");
    let target = parse_policy_version(&json!({
        "version": 2,
        "coverage_map": { "x": 75 },
    }))
    .expect("Không đọc được envelope");

    let actual = serde_json::to_value(diff_policy_versions(&base, &target))
        .expect("Không serialize được kết quả so sánh");

    assert_eq!(
        actual,
        json!({
            "from_version": 1,
            "to_version": 2,
            "rows": [{
                "key": "x",
                "kind": "changed",
                "before": { "type": "not_covered" },
                "after": { "type": "percent", "percent": 75.0 },
            }],
        })
    );
}

#[test]
fn envelope_accepts_field_aliases() {
    let version = parse_policy_version(&json!({
        "version_number": "7",
        "created_at": "2024-06-01T08:30:00Z",
        "coverage": { "metformin": "covered" },
    }))
    .expect("Không đọc được envelope");

    assert_eq!(version.version, 7);
    assert_eq!(
        version.effective_date,
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    );
    assert_eq!(version.coverage.len(), 1);
}

#[test]
fn envelope_converts_offsets_to_utc() {
    let version = parse_policy_version(&json!({
        "version": 1,
        "effective_date": "2025-02-15T00:00:00+07:00",
        "coverage_map": {},
    }))
    .expect("Không đọc được envelope");

    assert_eq!(
        version.effective_date,
        Some(Utc.with_ymd_and_hms(2025, 2, 14, 17, 0, 0).unwrap())
    );
}

#[test]
fn envelope_requires_version_and_coverage() {
    let missing_version = parse_policy_version(&json!({ "coverage_map": {} }));
    assert!(matches!(missing_version, Err(CoverageError::MissingData)));

    let missing_coverage = parse_policy_version(&json!({ "version": 2 }));
    assert!(matches!(missing_coverage, Err(CoverageError::MissingData)));
}

#[test]
fn envelope_falls_through_unparseable_fields() {
    let version = parse_policy_version(&json!({
        "version": "ba",
        "version_number": 3,
        "effective_date": "tháng sau",
        "created_at": "2024-01-05T00:00:00Z",
        "coverage_map": {},
    }))
    .expect("Không đọc được envelope");

    assert_eq!(version.version, 3);
    assert_eq!(
        version.effective_date,
        Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
    );
}

#[test]
fn envelope_parse_error_reports_bad_json() {
    let err = parse_policy_version_str("{").unwrap_err();
    assert!(matches!(err, CoverageError::Parse(_)));
}
