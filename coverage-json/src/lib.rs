//! Backend coverage JSON to canonical [`CoverageMap`] converter.

use chrono::{DateTime, Utc};
use coverage_core::{CoverageEntry, CoverageError, CoverageMap, PolicyVersion};
use serde_json::{Map, Value};

/// Normalize a coverage payload from a JSON string.
pub fn normalize_coverage_str(raw_json: &str) -> Result<CoverageMap, CoverageError> {
    let value: Value =
        serde_json::from_str(raw_json).map_err(|err| CoverageError::Parse(err.to_string()))?;
    Ok(normalize_coverage_value(&value))
}

/// Normalize a coverage payload already parsed into a `serde_json::Value`.
///
/// Accepts the shapes the backend has shipped over time: a map from item
/// name to entry, or a list of single-key `{ name: entry }` objects merged
/// with last duplicate winning. Entry values may be strict tagged objects,
/// bare percentages or loose keyword strings; see [`normalize_entry`].
/// Anything unusable is dropped, so this never fails: `null` or scalar
/// payloads give an empty map.
pub fn normalize_coverage_value(raw: &Value) -> CoverageMap {
    let mut coverage = CoverageMap::new();

    match raw {
        Value::Object(fields) => {
            for (name, value) in fields {
                if let Some(entry) = normalize_entry(value) {
                    coverage.insert(name.clone(), entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let Some(fields) = item.as_object() else {
                    continue;
                };
                // Theo hợp đồng dữ liệu mỗi phần tử chỉ có một khóa.
                let Some((name, value)) = fields.iter().next() else {
                    continue;
                };
                if let Some(entry) = normalize_entry(value) {
                    coverage.insert(name.clone(), entry);
                }
            }
        }
        _ => {}
    }

    coverage
}

/// Interpret one raw entry value; `None` means the item is dropped.
pub fn normalize_entry(value: &Value) -> Option<CoverageEntry> {
    match value {
        Value::Number(number) => {
            let raw = number.as_f64().filter(|percent| percent.is_finite())?;
            Some(entry_from_percent(raw))
        }
        Value::String(text) => entry_from_keyword(text),
        Value::Object(fields) => entry_from_object(fields),
        _ => None,
    }
}

/// Parse a policy-version envelope from a JSON string.
pub fn parse_policy_version_str(raw_json: &str) -> Result<PolicyVersion, CoverageError> {
    let value: Value =
        serde_json::from_str(raw_json).map_err(|err| CoverageError::Parse(err.to_string()))?;
    parse_policy_version(&value)
}

/// Parse a policy-version envelope into a [`PolicyVersion`].
///
/// A version number and a coverage field are required; the effective date
/// degrades to `None` when absent or unparseable.
pub fn parse_policy_version(raw: &Value) -> Result<PolicyVersion, CoverageError> {
    let version = extract_version(raw).ok_or(CoverageError::MissingData)?;

    let coverage_raw = ["coverage_map", "coverage"]
        .iter()
        .find_map(|field| raw.get(*field))
        .ok_or(CoverageError::MissingData)?;

    Ok(PolicyVersion {
        version,
        effective_date: extract_datetime(
            raw,
            &["effective_date", "effective_from", "created_at"],
        ),
        coverage: normalize_coverage_value(coverage_raw),
    })
}

fn entry_from_keyword(text: &str) -> Option<CoverageEntry> {
    let folded = text.trim().to_lowercase();

    match folded.as_str() {
        "covered" | "full" => return Some(CoverageEntry::Covered { copay: None }),
        "not covered" | "not_covered" | "none" => return Some(CoverageEntry::NotCovered),
        _ => {}
    }

    let numeric = folded.strip_suffix('%').unwrap_or(&folded).trim();
    let raw = numeric
        .parse::<f64>()
        .ok()
        .filter(|percent| percent.is_finite())?;
    Some(entry_from_percent(raw))
}

fn entry_from_object(fields: &Map<String, Value>) -> Option<CoverageEntry> {
    match fields.get("type").and_then(Value::as_str)? {
        "covered" => Some(CoverageEntry::Covered {
            copay: read_copay(fields),
        }),
        "not_covered" => Some(CoverageEntry::NotCovered),
        "percent" => {
            let percent = fields.get("percent").map_or(0.0, coerce_percent);
            Some(CoverageEntry::Percent {
                percent: clamp_percent(percent),
                copay: read_copay(fields),
            })
        }
        _ => None,
    }
}

/// A bare or string percentage: zero or less means the item is not covered.
fn entry_from_percent(raw: f64) -> CoverageEntry {
    let percent = clamp_percent(raw);
    if percent <= 0.0 {
        CoverageEntry::NotCovered
    } else {
        CoverageEntry::Percent {
            percent,
            copay: None,
        }
    }
}

fn clamp_percent(raw: f64) -> f64 {
    raw.clamp(0.0, 100.0)
}

/// Loose numeric coercion for the `percent` field; invalid values mean 0.
fn coerce_percent(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|percent| percent.is_finite()).unwrap_or(0.0)
}

fn read_copay(fields: &Map<String, Value>) -> Option<f64> {
    fields
        .get("copay")
        .and_then(Value::as_f64)
        .filter(|amount| amount.is_finite())
        .map(|amount| amount.max(0.0))
}

fn extract_version(raw: &Value) -> Option<u32> {
    for field in ["version", "version_number", "policy_version"] {
        let Some(value) = raw.get(field) else {
            continue;
        };
        if let Some(number) = value.as_u64() {
            if let Ok(version) = u32::try_from(number) {
                return Some(version);
            }
        }
        if let Some(text) = value.as_str() {
            if let Ok(version) = text.trim().parse::<u32>() {
                return Some(version);
            }
        }
    }
    None
}

fn extract_datetime(raw: &Value, fields: &[&str]) -> Option<DateTime<Utc>> {
    for field in fields {
        let Some(text) = raw.get(*field).and_then(Value::as_str) else {
            continue;
        };
        if let Some(parsed) = parse_datetime(text) {
            return Some(parsed);
        }
    }
    None
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
