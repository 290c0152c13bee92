//! Mô hình lõi cho bảng quyền lợi bảo hiểm và các phép so sánh, xếp hạng trên đó.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cấu hình khớp tên mục khi tra cứu và xếp hạng.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    /// Bỏ qua khác biệt chữ hoa/chữ thường khi khớp tên mục.
    pub fold_case: bool,
}

/// Mức chi trả cho một mục thuốc hoặc quyền lợi trong một phiên bản hợp đồng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoverageEntry {
    /// Chi trả toàn bộ, kèm đồng chi trả cố định nếu có.
    Covered {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        copay: Option<f64>,
    },
    /// Chi trả theo tỷ lệ phần trăm, luôn nằm trong [0, 100] sau chuẩn hóa.
    Percent {
        percent: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        copay: Option<f64>,
    },
    /// Không được chi trả.
    NotCovered,
}

impl CoverageEntry {
    /// Điểm thô của một mục khi xếp hạng hợp đồng (cao hơn là tốt hơn).
    pub fn points(&self) -> u8 {
        match self {
            CoverageEntry::Covered { .. } => 3,
            CoverageEntry::Percent { percent, .. } => {
                if *percent >= 100.0 {
                    3
                } else if *percent <= 0.0 {
                    0
                } else {
                    2
                }
            }
            CoverageEntry::NotCovered => 0,
        }
    }
}

impl fmt::Display for CoverageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageEntry::Covered { copay: None } => write!(f, "covered"),
            CoverageEntry::Covered { copay: Some(copay) } => {
                write!(f, "covered (copay {})", format_numeric(*copay))
            }
            CoverageEntry::Percent { percent, copay: None } => {
                write!(f, "{}%", format_numeric(*percent))
            }
            CoverageEntry::Percent { percent, copay: Some(copay) } => {
                write!(
                    f,
                    "{}% (copay {})",
                    format_numeric(*percent),
                    format_numeric(*copay)
                )
            }
            CoverageEntry::NotCovered => write!(f, "not covered"),
        }
    }
}

/// Bảng quyền lợi của một phiên bản hợp đồng, khóa theo tên mục.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CoverageMap(BTreeMap<String, CoverageEntry>);

impl CoverageMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Ghi một mục vào bảng; mục trùng tên bị ghi đè và giá trị cũ được trả về.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        entry: CoverageEntry,
    ) -> Option<CoverageEntry> {
        self.0.insert(name.into(), entry)
    }

    /// Tra cứu chính xác theo tên mục.
    pub fn get(&self, name: &str) -> Option<&CoverageEntry> {
        self.0.get(name)
    }

    /// Tra cứu theo cấu hình khớp tên: ưu tiên khớp chính xác, chỉ thử khớp
    /// không phân biệt hoa thường khi được bật.
    pub fn lookup(&self, name: &str, config: &MatchConfig) -> Option<&CoverageEntry> {
        if let Some(entry) = self.0.get(name) {
            return Some(entry);
        }
        if !config.fold_case {
            return None;
        }
        let folded = name.to_lowercase();
        self.0
            .iter()
            .find(|(key, _)| key.to_lowercase() == folded)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Duyệt các mục theo thứ tự tên.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CoverageEntry)> {
        self.0.iter()
    }
}

impl FromIterator<(String, CoverageEntry)> for CoverageMap {
    fn from_iter<I: IntoIterator<Item = (String, CoverageEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Một khác biệt giữa hai bảng quyền lợi tại một tên mục.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffRow {
    pub key: String,
    #[serde(flatten)]
    pub change: CoverageChange,
}

/// Nội dung thay đổi của một mục giữa bản gốc và bản đích.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoverageChange {
    Added { after: CoverageEntry },
    Changed { before: CoverageEntry, after: CoverageEntry },
    Removed { before: CoverageEntry },
}

impl CoverageChange {
    // Mục bị gỡ bỏ luôn xếp cuối danh sách khác biệt.
    fn sort_group(&self) -> u8 {
        match self {
            CoverageChange::Added { .. } | CoverageChange::Changed { .. } => 0,
            CoverageChange::Removed { .. } => 1,
        }
    }
}

/// So sánh hai bảng quyền lợi và trả về danh sách khác biệt đã sắp xếp.
///
/// Mục thêm mới hoặc thay đổi đứng trước mục bị gỡ bỏ; trong cùng nhóm sắp
/// theo tên mục tăng dần.
pub fn diff_coverage_maps(base: &CoverageMap, target: &CoverageMap) -> Vec<DiffRow> {
    let mut rows = Vec::new();

    for (key, before) in base.iter() {
        match target.get(key) {
            None => rows.push(DiffRow {
                key: key.clone(),
                change: CoverageChange::Removed {
                    before: before.clone(),
                },
            }),
            Some(after) if after != before => rows.push(DiffRow {
                key: key.clone(),
                change: CoverageChange::Changed {
                    before: before.clone(),
                    after: after.clone(),
                },
            }),
            Some(_) => {}
        }
    }

    for (key, after) in target.iter() {
        if base.get(key).is_none() {
            rows.push(DiffRow {
                key: key.clone(),
                change: CoverageChange::Added {
                    after: after.clone(),
                },
            });
        }
    }

    rows.sort_by(|a, b| {
        a.change
            .sort_group()
            .cmp(&b.change.sort_group())
            .then_with(|| a.key.cmp(&b.key))
    });
    rows
}

/// Ảnh chụp bất biến của một phiên bản hợp đồng (backend quản lý vòng đời).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyVersion {
    /// Số phiên bản tăng dần.
    pub version: u32,
    /// Ngày hiệu lực nếu backend cung cấp.
    pub effective_date: Option<DateTime<Utc>>,
    /// Bảng quyền lợi đã chuẩn hóa.
    pub coverage: CoverageMap,
}

/// Kết quả so sánh giữa hai phiên bản hợp đồng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionDiff {
    pub from_version: u32,
    pub to_version: u32,
    pub rows: Vec<DiffRow>,
}

/// So sánh bảng quyền lợi của hai phiên bản hợp đồng.
pub fn diff_policy_versions(base: &PolicyVersion, target: &PolicyVersion) -> VersionDiff {
    VersionDiff {
        from_version: base.version,
        to_version: target.version,
        rows: diff_coverage_maps(&base.coverage, &target.coverage),
    }
}

/// Mức chi trả thực tế được dùng để tính điểm cho một mục bắt buộc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedItem {
    pub name: String,
    pub entry: Option<CoverageEntry>,
    pub points: u8,
}

/// Hợp đồng được chọn sau khi xếp hạng, kèm chi tiết từng mục để hiển thị.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BestPolicy {
    pub policy_id: String,
    pub score: u32,
    pub items: Vec<RankedItem>,
}

/// Chọn hợp đồng chi trả tốt nhất cho danh sách mục bắt buộc.
///
/// Điểm của mỗi hợp đồng là tổng điểm từng mục; chỉ điểm cao hơn hẳn mới
/// thay thế, nên hợp đồng đứng trước thắng khi hòa điểm.
pub fn rank_policies(
    candidates: &[(String, CoverageMap)],
    required: &[String],
    config: &MatchConfig,
) -> Option<BestPolicy> {
    let mut best: Option<BestPolicy> = None;

    for (policy_id, coverage) in candidates {
        let items: Vec<RankedItem> = required
            .iter()
            .map(|name| {
                let entry = coverage.lookup(name, config).cloned();
                let points = entry.as_ref().map_or(0, CoverageEntry::points);
                RankedItem {
                    name: name.clone(),
                    entry,
                    points,
                }
            })
            .collect();

        let score = items.iter().map(|item| u32::from(item.points)).sum();

        if best.as_ref().map_or(true, |current| score > current.score) {
            best = Some(BestPolicy {
                policy_id: policy_id.clone(),
                score,
                items,
            });
        }
    }

    best
}

/// Lỗi chung khi đọc dữ liệu quyền lợi.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
}

fn format_numeric(value: f64) -> String {
    if (value.fract() - 0.0).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else if (value * 10.0).fract().abs() < f64::EPSILON {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
