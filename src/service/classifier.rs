use bigdecimal::{BigDecimal, Zero};

use crate::models::{
    BreakdownMethod, ChargeType, ClassifiedLineItem, CostBreakdown, DataQualityIssue,
    DataQualityKind, LineItem, Side, VehicleSystem,
};
use crate::money;
use crate::service::keywords::{self, KEYWORD_SETS};

/// Confidence never exceeds this, whatever the evidence.
const MAX_CONFIDENCE: f64 = 0.95;
const BASE_CONFIDENCE: f64 = 0.5;

/// Part share (in hundredths) when nothing better is known.
const DEFAULT_PART_SHARE: u32 = 60;

/// Classify a whole side, recording breakdowns that do not add up.
pub fn classify_all(
    items: Vec<LineItem>,
    side: Side,
    scale: i64,
    issues: &mut Vec<DataQualityIssue>,
) -> Vec<ClassifiedLineItem> {
    let classified: Vec<ClassifiedLineItem> = items
        .into_iter()
        .map(|item| classify(item, side, scale, issues))
        .collect();

    let unknown = classified
        .iter()
        .filter(|c| c.charge_type == ChargeType::Unknown)
        .count();
    tracing::debug!(
        "classified {:?} side: {} items, {} unknown",
        side,
        classified.len(),
        unknown
    );

    classified
}

pub fn classify(
    item: LineItem,
    side: Side,
    scale: i64,
    issues: &mut Vec<DataQualityIssue>,
) -> ClassifiedLineItem {
    let charge_type = determine_charge_type(&item);
    let confidence = confidence(&item, charge_type);
    let vehicle_system =
        keywords::infer_vehicle_system(item.category.as_deref(), &item.normalized_description);
    let mut cost_breakdown = separate_costs(&item, charge_type, vehicle_system, scale);

    if charge_type == ChargeType::PartWithLabor
        && cost_breakdown.method == BreakdownMethod::ExplicitRate
        && !cost_breakdown.is_validated
    {
        issues.push(DataQualityIssue {
            kind: DataQualityKind::CalculationInconsistency,
            side,
            item_id: Some(item.id.clone()),
            detail: format!(
                "labor {} exceeds total {}; part cost would be {}",
                cost_breakdown.labor_cost, item.total, cost_breakdown.part_cost
            ),
        });
    }

    if cost_breakdown.is_validated
        && !money::within_tolerance(&cost_breakdown.component_sum(), &item.total, &money::cent())
    {
        cost_breakdown.is_validated = false;
        issues.push(DataQualityIssue {
            kind: DataQualityKind::CalculationInconsistency,
            side,
            item_id: Some(item.id.clone()),
            detail: format!(
                "components sum to {} but total is {}",
                cost_breakdown.component_sum(),
                item.total
            ),
        });
    }

    ClassifiedLineItem {
        item,
        charge_type,
        confidence,
        vehicle_system,
        cost_breakdown,
    }
}

/// Priority-ordered decision; the first rule that applies wins.
pub fn determine_charge_type(item: &LineItem) -> ChargeType {
    // 1. operation code
    if let Some(op) = item.operation_code.as_deref().and_then(keywords::lookup_operation) {
        return op.charge_type();
    }

    // 2. category hint
    if let Some(charge_type) = item.category.as_deref().and_then(keywords::lookup_category) {
        return charge_type;
    }

    // 3. part number
    if item.has_part_number() {
        return ChargeType::PartWithLabor;
    }

    // 4. keyword sets, in table order
    if let Some(set) = KEYWORD_SETS
        .iter()
        .find(|set| set.hits(&item.normalized_description) > 0)
    {
        return set.charge_type;
    }

    // 5. fallback
    if has_labor_hours(item) {
        ChargeType::LaborOnly
    } else {
        ChargeType::Unknown
    }
}

/// Evidence-weighted confidence in `charge_type`, independent of which rule
/// made the decision.
pub fn confidence(item: &LineItem, charge_type: ChargeType) -> f64 {
    let mut score = BASE_CONFIDENCE;

    if let Some(op) = item.operation_code.as_deref().and_then(keywords::lookup_operation) {
        if op.charge_type() == charge_type {
            score += 0.3;
        }
    }

    if item.has_part_number() && charge_type == ChargeType::PartWithLabor {
        score += 0.15;
        if has_labor_hours(item) {
            score += 0.1;
        }
    }

    if has_labor_hours(item)
        && matches!(charge_type, ChargeType::PartWithLabor | ChargeType::LaborOnly)
    {
        score += 0.05;
    }

    match item.category.as_deref().and_then(keywords::lookup_category) {
        Some(hinted) if hinted == charge_type => score += 0.15,
        Some(_) => score -= 0.1,
        None => {}
    }

    let keyword_hits: usize = KEYWORD_SETS
        .iter()
        .filter(|set| set.charge_type == charge_type)
        .map(|set| set.hits(&item.normalized_description))
        .sum();
    score += (0.05 * keyword_hits as f64).min(0.15);

    if charge_type == ChargeType::Unknown {
        score = score.min(BASE_CONFIDENCE);
    }

    money::round_score(score.clamp(0.0, MAX_CONFIDENCE))
}

/// Cost components for a classified item.
pub fn separate_costs(
    item: &LineItem,
    charge_type: ChargeType,
    system: VehicleSystem,
    scale: i64,
) -> CostBreakdown {
    match charge_type {
        ChargeType::PartWithLabor => split_part_and_labor(item, system, scale),
        ChargeType::LaborOnly => CostBreakdown {
            part_cost: BigDecimal::zero(),
            labor_cost: item.total.clone(),
            material_cost: BigDecimal::zero(),
            is_validated: true,
            method: BreakdownMethod::SingleComponent,
        },
        ChargeType::Material => CostBreakdown {
            part_cost: BigDecimal::zero(),
            labor_cost: BigDecimal::zero(),
            material_cost: item.total.clone(),
            is_validated: true,
            method: BreakdownMethod::SingleComponent,
        },
        ChargeType::Sublet | ChargeType::Miscellaneous | ChargeType::Unknown => {
            CostBreakdown::not_applicable()
        }
    }
}

fn split_part_and_labor(item: &LineItem, system: VehicleSystem, scale: i64) -> CostBreakdown {
    let total = &item.total;
    let hours = item.labor_hours.as_ref().filter(|h| **h > BigDecimal::zero());
    let explicit_rate = item.labor_rate.as_ref().filter(|r| **r > BigDecimal::zero());
    let default_rate = BigDecimal::from(keywords::default_labor_rate(system));

    // warranty-style zero-dollar line: report the labor value, never validate
    if total.is_zero() {
        if let Some(hours) = hours {
            let rate = explicit_rate.unwrap_or(&default_rate);
            return CostBreakdown {
                part_cost: BigDecimal::zero(),
                labor_cost: money::round_half_up(&(hours * rate), scale),
                material_cost: BigDecimal::zero(),
                is_validated: false,
                method: BreakdownMethod::ZeroTotalLabor,
            };
        }
    }

    // 1. explicit hours and rate
    if let (Some(hours), Some(rate)) = (hours, explicit_rate) {
        let labor_cost = money::round_half_up(&(hours * rate), scale);
        let part_cost = total - &labor_cost;
        let is_validated = part_cost >= BigDecimal::zero()
            && money::within_tolerance(&(&part_cost + &labor_cost), total, &money::cent());
        return CostBreakdown {
            part_cost,
            labor_cost,
            material_cost: BigDecimal::zero(),
            is_validated,
            method: BreakdownMethod::ExplicitRate,
        };
    }

    // 2. hours with an inferred rate; labor capped at the total
    if let Some(hours) = hours {
        let inferred = money::round_half_up(&(hours * &default_rate), scale);
        let labor_cost = if *total > BigDecimal::zero() {
            inferred.min(total.clone())
        } else {
            inferred
        };
        return CostBreakdown {
            part_cost: total - &labor_cost,
            labor_cost,
            material_cost: BigDecimal::zero(),
            is_validated: false,
            method: BreakdownMethod::InferredRate,
        };
    }

    // 3. typical ratio for the operation, 4. default split
    let (share, method) = match item
        .operation_code
        .as_deref()
        .and_then(keywords::lookup_operation)
        .and_then(|op| op.typical_part_share())
    {
        Some(share) => (share, BreakdownMethod::OperationRatio),
        None => (DEFAULT_PART_SHARE, BreakdownMethod::DefaultSplit),
    };
    let part_cost = money::round_half_up(
        &(total * BigDecimal::from(share) / BigDecimal::from(100)),
        scale,
    );
    CostBreakdown {
        labor_cost: total - &part_cost,
        part_cost,
        material_cost: BigDecimal::zero(),
        is_validated: false,
        method,
    }
}

fn has_labor_hours(item: &LineItem) -> bool {
    item.labor_hours
        .as_ref()
        .is_some_and(|h| *h > BigDecimal::zero())
}
