use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use super::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeType {
    PartWithLabor,
    LaborOnly,
    Material,
    Sublet,
    Miscellaneous,
    Unknown,
}

impl ChargeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartWithLabor => "part_with_labor",
            Self::LaborOnly => "labor_only",
            Self::Material => "material",
            Self::Sublet => "sublet",
            Self::Miscellaneous => "miscellaneous",
            Self::Unknown => "unknown",
        }
    }
}

/// Branch of the cost separation that produced a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownMethod {
    /// labor_hours x labor_rate, both on the record.
    ExplicitRate,
    /// labor_hours on the record, rate from the vehicle-system table.
    InferredRate,
    /// Typical part/labor ratio for the operation code.
    OperationRatio,
    /// No signal: fixed 60/40 split.
    DefaultSplit,
    /// Zero-dollar line with labor hours (warranty and similar).
    ZeroTotalLabor,
    /// Whole total belongs to one component (labor-only, material).
    SingleComponent,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub part_cost: BigDecimal,
    pub labor_cost: BigDecimal,
    pub material_cost: BigDecimal,
    /// Set only when the components are known to sum to the total within $0.01.
    pub is_validated: bool,
    pub method: BreakdownMethod,
}

impl CostBreakdown {
    pub fn not_applicable() -> Self {
        Self {
            part_cost: BigDecimal::zero(),
            labor_cost: BigDecimal::zero(),
            material_cost: BigDecimal::zero(),
            is_validated: false,
            method: BreakdownMethod::NotApplicable,
        }
    }

    pub fn component_sum(&self) -> BigDecimal {
        &self.part_cost + &self.labor_cost + &self.material_cost
    }
}

/// Vehicle system used for default labor rates and labor-hour caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleSystem {
    Body,
    Refinish,
    Mechanical,
    Frame,
    Electrical,
    Glass,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLineItem {
    #[serde(flatten)]
    pub item: LineItem,
    pub charge_type: ChargeType,
    pub confidence: f64,
    pub vehicle_system: VehicleSystem,
    pub cost_breakdown: CostBreakdown,
}

impl ClassifiedLineItem {
    pub fn id(&self) -> &str {
        &self.item.id
    }

    /// Rollup key: the category hint, or the charge type when there is none.
    pub fn rollup_category(&self) -> String {
        self.item
            .category_key()
            .unwrap_or_else(|| self.charge_type.as_str().to_string())
    }
}
