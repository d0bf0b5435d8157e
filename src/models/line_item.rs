use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Candidate line item as handed over by the extraction step.
///
/// Numeric fields stay untyped here: extractors emit JSON numbers, numeric
/// strings, or garbage, and the normalizer decides which is which.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLineItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub unit_price: Option<Value>,
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub operation_code: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub labor_hours: Option<Value>,
    #[serde(default)]
    pub labor_rate: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Validated line item.
///
/// `total` is the authoritative charged amount; `quantity * unit_price` is
/// advisory and may differ for lump-sum charges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub description: String,
    /// Case-folded, punctuation-free, stop-word-free description.
    pub normalized_description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub total: BigDecimal,
    pub operation_code: Option<String>,
    pub part_number: Option<String>,
    pub labor_hours: Option<BigDecimal>,
    pub labor_rate: Option<BigDecimal>,
    pub category: Option<String>,
}

impl LineItem {
    pub fn has_part_number(&self) -> bool {
        self.part_number
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    /// Lowercased category hint, if any.
    pub fn category_key(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }
}

/// Which collection a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Original,
    Revised,
}
