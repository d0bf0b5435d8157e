use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::{Severity, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    NewItem,
    RemovedItem,
    QuantityChange,
    PriceChange,
    TotalChange,
}

/// A reportable difference between the two estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: String,
    pub kind: DiscrepancyKind,
    pub severity: Severity,
    pub original_item_id: Option<String>,
    pub revised_item_id: Option<String>,
    /// Signed effect on the estimate total.
    pub amount_impact: BigDecimal,
    pub percent: Option<BigDecimal>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityKind {
    /// Record dropped, or an optional field discarded, during normalization.
    InvalidInput,
    /// quantity x unit_price does not reproduce the total. Advisory only.
    PriceExtensionMismatch,
    /// Cost components do not add up to the total.
    CalculationInconsistency,
    /// Two originals tied for a revised item.
    MatchingAmbiguity,
}

/// Non-fatal finding attached to the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub kind: DataQualityKind,
    pub side: Side,
    pub item_id: Option<String>,
    pub detail: String,
}
