use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{ChangeType, Significance};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVariance {
    pub original_total: BigDecimal,
    pub revised_total: BigDecimal,
    pub variance: BigDecimal,
    pub variance_percent: Option<BigDecimal>,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBucket {
    pub count: usize,
    /// Net amount moved by items in this bucket.
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    pub mean: Option<BigDecimal>,
    pub median: Option<BigDecimal>,
    pub std_dev: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighVarianceItem {
    pub original_item_id: String,
    pub revised_item_id: String,
    pub description: String,
    pub delta: BigDecimal,
    pub percent: Option<BigDecimal>,
    pub significance: Significance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    DuplicateDescription,
    RoundNumberBias,
    OemToAftermarketAtOemRate,
    ExcessiveLaborHours,
    RarelyDamagedComponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl From<Significance> for Severity {
    fn from(significance: Significance) -> Self {
        match significance {
            Significance::Negligible => Severity::Info,
            Significance::Minor => Severity::Low,
            Significance::Moderate => Severity::Medium,
            Significance::Major => Severity::High,
            Significance::Extreme => Severity::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousPattern {
    pub id: String,
    pub kind: PatternKind,
    pub severity: Severity,
    pub item_ids: Vec<String>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceStatistics {
    pub original_total: BigDecimal,
    pub revised_total: BigDecimal,
    pub total_variance: BigDecimal,
    /// `None` when the original grand total is zero.
    pub total_variance_percent: Option<BigDecimal>,
    /// Keyed by category hint or charge type, sorted by key.
    pub category_variance: IndexMap<String, CategoryVariance>,
    pub change_distribution: IndexMap<ChangeType, ChangeBucket>,
    pub dispersion: Dispersion,
    pub high_variance_items: Vec<HighVarianceItem>,
    pub suspicious_patterns: Vec<SuspiciousPattern>,
}
