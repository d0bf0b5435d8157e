use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;

use crate::models::{
    CategoryVariance, ChangeBucket, ChangeType, ClassifiedLineItem, Dispersion, FieldVariance,
    HighVarianceItem, LineItem, ReconciliationResult, Significance, VarianceDetail,
    VarianceStatistics,
};
use crate::money;
use crate::service::context::AnalysisContext;
use crate::service::patterns::detect_patterns;

/// Bucket an absolute percent change. `percent` is `None` when the original
/// value was zero, in which case any revised value counts as extreme.
pub fn significance(percent: Option<&BigDecimal>, revised: &BigDecimal) -> Significance {
    let Some(percent) = percent else {
        return if revised.is_zero() {
            Significance::Negligible
        } else {
            Significance::Extreme
        };
    };

    let magnitude = percent.abs();
    if magnitude < BigDecimal::from(1) {
        Significance::Negligible
    } else if magnitude < BigDecimal::from(5) {
        Significance::Minor
    } else if magnitude < BigDecimal::from(15) {
        Significance::Moderate
    } else if magnitude <= BigDecimal::from(50) {
        Significance::Major
    } else {
        Significance::Extreme
    }
}

pub fn field_variance(original: &BigDecimal, revised: &BigDecimal, scale: i64) -> FieldVariance {
    let delta = revised - original;
    let percent = money::percent_of(&delta, original, scale);
    let significance = significance(percent.as_ref(), revised);
    FieldVariance {
        original: original.clone(),
        revised: revised.clone(),
        delta,
        percent,
        significance,
    }
}

/// Per-field deltas between a matched original and revised item.
pub fn pair_variance(original: &LineItem, revised: &LineItem, scale: i64) -> VarianceDetail {
    let quantity = field_variance(&original.quantity, &revised.quantity, scale);
    let unit_price = field_variance(&original.unit_price, &revised.unit_price, scale);
    let total = field_variance(&original.total, &revised.total, scale);

    let change_type = if !quantity.delta.is_zero() {
        ChangeType::QuantityChanged
    } else if !unit_price.delta.is_zero() || !total.delta.is_zero() {
        ChangeType::PriceChanged
    } else {
        ChangeType::Unchanged
    };

    VarianceDetail {
        significance: total.significance,
        quantity,
        unit_price,
        total,
        change_type,
    }
}

#[derive(Default)]
struct CategoryAccumulator {
    original_total: BigDecimal,
    revised_total: BigDecimal,
    item_count: usize,
}

/// Aggregate statistics over a reconciliation, suspicious patterns included.
pub fn analyze_variance(
    recon: &ReconciliationResult,
    ctx: &mut AnalysisContext,
) -> VarianceStatistics {
    let scale = ctx.scale();

    // grand totals over the full partition
    let original_total = money::sum(
        recon
            .matched_pairs
            .iter()
            .map(|p| &p.original.item.total)
            .chain(recon.unmatched_original.iter().map(|i| &i.item.total)),
    );
    let revised_total = money::sum(
        recon
            .matched_pairs
            .iter()
            .map(|p| &p.revised.item.total)
            .chain(recon.new_supplement_items.iter().map(|i| &i.item.total)),
    );
    let total_variance = &revised_total - &original_total;
    let total_variance_percent = money::percent_of(&total_variance, &original_total, scale);

    let statistics = VarianceStatistics {
        category_variance: category_rollup(recon, scale),
        change_distribution: change_distribution(recon),
        dispersion: dispersion(recon, scale),
        high_variance_items: high_variance_items(recon),
        suspicious_patterns: detect_patterns(recon, ctx),
        original_total,
        revised_total,
        total_variance,
        total_variance_percent,
    };

    tracing::debug!(
        "variance {} ({:?}%), {} high-variance items, {} patterns",
        statistics.total_variance,
        statistics.total_variance_percent,
        statistics.high_variance_items.len(),
        statistics.suspicious_patterns.len()
    );

    statistics
}

fn category_rollup(recon: &ReconciliationResult, scale: i64) -> IndexMap<String, CategoryVariance> {
    let mut groups: IndexMap<String, CategoryAccumulator> = IndexMap::new();

    for pair in &recon.matched_pairs {
        let entry = groups.entry(pair.revised.rollup_category()).or_default();
        entry.original_total += &pair.original.item.total;
        entry.revised_total += &pair.revised.item.total;
        entry.item_count += 1;
    }
    for item in &recon.unmatched_original {
        let entry = groups.entry(item.rollup_category()).or_default();
        entry.original_total += &item.item.total;
        entry.item_count += 1;
    }
    for item in &recon.new_supplement_items {
        let entry = groups.entry(item.rollup_category()).or_default();
        entry.revised_total += &item.item.total;
        entry.item_count += 1;
    }

    groups.sort_keys();
    groups
        .into_iter()
        .map(|(category, acc)| {
            let variance = &acc.revised_total - &acc.original_total;
            let variance_percent = money::percent_of(&variance, &acc.original_total, scale);
            (
                category,
                CategoryVariance {
                    original_total: acc.original_total,
                    revised_total: acc.revised_total,
                    variance,
                    variance_percent,
                    item_count: acc.item_count,
                },
            )
        })
        .collect()
}

fn change_distribution(recon: &ReconciliationResult) -> IndexMap<ChangeType, ChangeBucket> {
    let mut buckets: IndexMap<ChangeType, ChangeBucket> = [
        ChangeType::New,
        ChangeType::Removed,
        ChangeType::QuantityChanged,
        ChangeType::PriceChanged,
        ChangeType::Unchanged,
    ]
    .into_iter()
    .map(|kind| {
        (
            kind,
            ChangeBucket {
                count: 0,
                amount: BigDecimal::zero(),
            },
        )
    })
    .collect();

    let mut add = |kind: ChangeType, amount: BigDecimal| {
        if let Some(bucket) = buckets.get_mut(&kind) {
            bucket.count += 1;
            bucket.amount += amount;
        }
    };

    for item in &recon.new_supplement_items {
        add(ChangeType::New, item.item.total.clone());
    }
    for item in &recon.unmatched_original {
        add(ChangeType::Removed, -item.item.total.clone());
    }
    for pair in &recon.matched_pairs {
        add(
            pair.variance_detail.change_type,
            pair.variance_detail.total.delta.clone(),
        );
    }

    buckets
}

/// Mean, median and population standard deviation of matched-pair total deltas.
fn dispersion(recon: &ReconciliationResult, scale: i64) -> Dispersion {
    let mut deltas: Vec<BigDecimal> = recon
        .matched_pairs
        .iter()
        .map(|p| p.variance_detail.total.delta.clone())
        .collect();
    if deltas.is_empty() {
        return Dispersion {
            mean: None,
            median: None,
            std_dev: None,
        };
    }

    let count = BigDecimal::from(deltas.len() as u64);
    let mean = money::sum(&deltas) / &count;

    deltas.sort();
    let mid = deltas.len() / 2;
    let median = if deltas.len() % 2 == 0 {
        (&deltas[mid - 1] + &deltas[mid]) / BigDecimal::from(2)
    } else {
        deltas[mid].clone()
    };

    let variance = deltas
        .iter()
        .map(|d| {
            let diff = d - &mean;
            &diff * &diff
        })
        .fold(BigDecimal::zero(), |acc, sq| acc + sq)
        / &count;
    let std_dev = variance.sqrt().map(|s| money::round_half_up(&s, scale));

    Dispersion {
        mean: Some(money::round_half_up(&mean, scale)),
        median: Some(money::round_half_up(&median, scale)),
        std_dev,
    }
}

fn high_variance_items(recon: &ReconciliationResult) -> Vec<HighVarianceItem> {
    let mut items: Vec<HighVarianceItem> = recon
        .matched_pairs
        .iter()
        .filter(|p| p.variance_detail.significance >= Significance::Major)
        .map(|p| HighVarianceItem {
            original_item_id: p.original.id().to_string(),
            revised_item_id: p.revised.id().to_string(),
            description: p.revised.item.description.clone(),
            delta: p.variance_detail.total.delta.clone(),
            percent: p.variance_detail.total.percent.clone(),
            significance: p.variance_detail.significance,
        })
        .collect();

    items.sort_by(|a, b| {
        b.delta
            .abs()
            .cmp(&a.delta.abs())
            .then_with(|| a.revised_item_id.cmp(&b.revised_item_id))
    });
    items
}

/// Items on the revised side, in a stable order.
pub(crate) fn revised_side(recon: &ReconciliationResult) -> Vec<&ClassifiedLineItem> {
    let mut items: Vec<&ClassifiedLineItem> = recon
        .matched_pairs
        .iter()
        .map(|p| &p.revised)
        .chain(recon.new_supplement_items.iter())
        .collect();
    items.sort_by(|a, b| {
        a.item
            .normalized_description
            .cmp(&b.item.normalized_description)
            .then_with(|| a.id().cmp(b.id()))
    });
    items
}
