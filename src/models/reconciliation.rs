use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::ClassifiedLineItem;

/// Component scores behind a match score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    pub exact_description: bool,
    pub fuzzy_similarity: f64,
    pub category_match: f64,
    pub price_similarity: f64,
}

/// Significance bucket of an absolute percent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Negligible,
    Minor,
    Moderate,
    Major,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    New,
    Removed,
    QuantityChanged,
    PriceChanged,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldVariance {
    pub original: BigDecimal,
    pub revised: BigDecimal,
    pub delta: BigDecimal,
    /// Percent of the original value; `None` when the original is zero.
    pub percent: Option<BigDecimal>,
    pub significance: Significance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceDetail {
    pub quantity: FieldVariance,
    pub unit_price: FieldVariance,
    pub total: FieldVariance,
    /// Significance of the total change; drives discrepancy severity.
    pub significance: Significance,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub original: ClassifiedLineItem,
    pub revised: ClassifiedLineItem,
    pub match_score: f64,
    pub match_criteria: MatchCriteria,
    pub variance_detail: VarianceDetail,
    /// Another original scored within epsilon; flagged for manual review.
    pub ambiguous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub matched_pairs: Vec<MatchedPair>,
    /// Items removed by the supplement.
    pub unmatched_original: Vec<ClassifiedLineItem>,
    /// Items added by the supplement.
    pub new_supplement_items: Vec<ClassifiedLineItem>,
    /// Mean accepted match score, 0 when nothing matched.
    pub matching_accuracy: f64,
    /// Share of all items that ended up in a pair.
    pub match_rate: f64,
}
