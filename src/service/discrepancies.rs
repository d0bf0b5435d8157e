use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};

use crate::models::{
    ChangeType, ClassifiedLineItem, Discrepancy, DiscrepancyKind, FieldVariance, MatchedPair,
    ReconciliationResult, Severity, VarianceStatistics,
};
use crate::money;
use crate::service::context::AnalysisContext;
use crate::service::variance::significance;

/// Reportable differences: one per changed pair above the significance
/// threshold, plus every removed and every added item.
pub fn build_discrepancies(
    recon: &ReconciliationResult,
    stats: &VarianceStatistics,
    ctx: &mut AnalysisContext,
) -> Vec<Discrepancy> {
    let scale = ctx.scale();
    let threshold = BigDecimal::from_str(&ctx.options().significance_threshold_percent.to_string())
        .unwrap_or_else(|_| BigDecimal::zero());
    let mut out = Vec::new();

    for pair in &recon.matched_pairs {
        let Some((kind, field)) = reported_change(pair) else {
            continue;
        };
        let above_threshold = field
            .percent
            .as_ref()
            .map_or(true, |p| p.abs() >= threshold);
        if !above_threshold {
            continue;
        }

        let detail = match kind {
            DiscrepancyKind::QuantityChange => format!(
                "'{}' quantity {} -> {}",
                pair.revised.item.description, field.original, field.revised
            ),
            DiscrepancyKind::PriceChange => format!(
                "'{}' unit price {} -> {}",
                pair.revised.item.description, field.original, field.revised
            ),
            _ => format!(
                "'{}' total {} -> {} ({})",
                pair.revised.item.description,
                field.original,
                field.revised,
                describe_percent(field.percent.as_ref())
            ),
        };

        out.push(Discrepancy {
            id: ctx.next_discrepancy_id(),
            kind,
            severity: Severity::from(field.significance),
            original_item_id: Some(pair.original.id().to_string()),
            revised_item_id: Some(pair.revised.id().to_string()),
            amount_impact: pair.variance_detail.total.delta.clone(),
            percent: field.percent.clone(),
            detail,
        });
    }

    for item in &recon.unmatched_original {
        let impact = -item.item.total.clone();
        out.push(Discrepancy {
            id: ctx.next_discrepancy_id(),
            kind: DiscrepancyKind::RemovedItem,
            severity: share_severity(item, &stats.original_total, scale),
            original_item_id: Some(item.id().to_string()),
            revised_item_id: None,
            amount_impact: impact,
            percent: None,
            detail: format!("'{}' ({}) removed from the estimate", item.item.description, item.item.total),
        });
    }

    for item in &recon.new_supplement_items {
        out.push(Discrepancy {
            id: ctx.next_discrepancy_id(),
            kind: DiscrepancyKind::NewItem,
            severity: share_severity(item, &stats.original_total, scale),
            original_item_id: None,
            revised_item_id: Some(item.id().to_string()),
            amount_impact: item.item.total.clone(),
            percent: None,
            detail: format!("'{}' ({}) added by the supplement", item.item.description, item.item.total),
        });
    }

    tracing::debug!("{} discrepancies", out.len());
    out
}

/// The most specific field that changed: total, then unit price, then quantity.
fn reported_change(pair: &MatchedPair) -> Option<(DiscrepancyKind, &FieldVariance)> {
    let detail = &pair.variance_detail;
    if detail.change_type == ChangeType::Unchanged {
        return None;
    }
    if !detail.total.delta.is_zero() {
        Some((DiscrepancyKind::TotalChange, &detail.total))
    } else if !detail.unit_price.delta.is_zero() {
        Some((DiscrepancyKind::PriceChange, &detail.unit_price))
    } else if !detail.quantity.delta.is_zero() {
        Some((DiscrepancyKind::QuantityChange, &detail.quantity))
    } else {
        None
    }
}

/// Severity of an added or removed item from its share of the original total.
fn share_severity(item: &ClassifiedLineItem, original_total: &BigDecimal, scale: i64) -> Severity {
    let share = money::percent_of(&item.item.total, original_total, scale);
    Severity::from(significance(share.as_ref(), &item.item.total))
}

fn describe_percent(percent: Option<&BigDecimal>) -> String {
    match percent {
        Some(p) => format!("{p}%"),
        None => "from zero".to_string(),
    }
}
