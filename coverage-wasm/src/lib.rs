//! Bridge WASM <-> JavaScript trung lập framework.

use coverage_core::{CoverageError, CoverageMap, MatchConfig};
use coverage_json::{normalize_coverage_value, parse_policy_version};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsMatchConfig {
    #[serde(default)]
    fold_case: Option<bool>,
}

impl From<JsMatchConfig> for MatchConfig {
    fn from(cfg: JsMatchConfig) -> Self {
        let mut base = MatchConfig::default();
        if let Some(fold_case) = cfg.fold_case {
            base.fold_case = fold_case;
        }
        base
    }
}

#[derive(Deserialize)]
struct JsCandidate {
    policy_id: String,
    coverage_map: serde_json::Value,
}

#[wasm_bindgen]
pub fn normalize_coverage(raw: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let raw_value = from_value::<serde_json::Value>(raw)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON quyền lợi: {err}")))?;

    let coverage = normalize_coverage_value(&raw_value);

    to_plain_js(&coverage)
        .map_err(|err| JsValue::from_str(&format!("Không serialize bảng quyền lợi: {err}")))
}

#[wasm_bindgen]
pub fn diff_coverage(base: JsValue, target: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let base_value = from_value::<serde_json::Value>(base)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON bản gốc: {err}")))?;
    let target_value = from_value::<serde_json::Value>(target)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON bản đích: {err}")))?;

    let rows = coverage_core::diff_coverage_maps(
        &normalize_coverage_value(&base_value),
        &normalize_coverage_value(&target_value),
    );

    to_plain_js(&rows)
        .map_err(|err| JsValue::from_str(&format!("Không serialize danh sách khác biệt: {err}")))
}

#[wasm_bindgen]
pub fn diff_versions(base: JsValue, target: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let base_value = from_value::<serde_json::Value>(base)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON bản gốc: {err}")))?;
    let target_value = from_value::<serde_json::Value>(target)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON bản đích: {err}")))?;

    let base_version = parse_policy_version(&base_value)
        .map_err(|err| JsValue::from_str(&format_coverage_error(err)))?;
    let target_version = parse_policy_version(&target_value)
        .map_err(|err| JsValue::from_str(&format_coverage_error(err)))?;

    let diff = coverage_core::diff_policy_versions(&base_version, &target_version);

    to_plain_js(&diff)
        .map_err(|err| JsValue::from_str(&format!("Không serialize kết quả so sánh: {err}")))
}

#[wasm_bindgen]
pub fn rank_policies(
    candidates: JsValue,
    required: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let candidates: Vec<JsCandidate> = from_value(candidates)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh sách hợp đồng: {err}")))?;
    let required: Vec<String> = from_value(required).map_err(|err| {
        JsValue::from_str(&format!("Không đọc được danh sách mục bắt buộc: {err}"))
    })?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsMatchConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            MatchConfig::from(cfg)
        }
        None => MatchConfig::default(),
    };

    let pairs: Vec<(String, CoverageMap)> = candidates
        .into_iter()
        .map(|candidate| {
            (
                candidate.policy_id,
                normalize_coverage_value(&candidate.coverage_map),
            )
        })
        .collect();

    let best = coverage_core::rank_policies(&pairs, &required, &cfg);

    to_plain_js(&best)
        .map_err(|err| JsValue::from_str(&format!("Không serialize kết quả xếp hạng: {err}")))
}

// Map Rust serialize thành object/null thuần thay vì ES Map/undefined.
fn to_plain_js<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::json_compatible())
}

fn format_coverage_error(err: CoverageError) -> String {
    format!("Coverage error: {err}")
}
