use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;

use crate::models::{
    ChangeType, ClassifiedLineItem, MatchedPair, PatternKind, ReconciliationResult, Severity,
    SuspiciousPattern,
};
use crate::service::context::AnalysisContext;
use crate::service::keywords::{self, AFTERMARKET_HINTS, OEM_HINTS};
use crate::service::similarity::fuzzy_similarity;
use crate::service::variance::revised_side;

/// Fewer changed items than this cannot show a price bias.
const ROUND_NUMBER_MIN_ITEMS: usize = 3;
/// Share of round prices (percent) above which the bias is flagged.
const ROUND_NUMBER_SHARE: usize = 30;

/// Words naming where a part comes from rather than what it is.
const SOURCING_WORDS: &[&str] = &["oem", "oe", "genuine", "aftermarket", "am", "capa", "non"];

type Finding = (PatternKind, Severity, Vec<String>, String);

/// Run every detector; patterns come back in detector order.
pub fn detect_patterns(
    recon: &ReconciliationResult,
    ctx: &mut AnalysisContext,
) -> Vec<SuspiciousPattern> {
    let mut found: Vec<Finding> = Vec::new();

    found.extend(duplicate_descriptions(recon));
    found.extend(round_number_bias(recon));
    found.extend(oem_to_aftermarket(recon, ctx.options().fuzzy_threshold));
    found.extend(excessive_labor_hours(recon));
    found.extend(rarely_damaged_components(recon));

    found
        .into_iter()
        .map(|(kind, severity, item_ids, detail)| SuspiciousPattern {
            id: ctx.next_pattern_id(),
            kind,
            severity,
            item_ids,
            detail,
        })
        .collect()
}

fn duplicate_descriptions(recon: &ReconciliationResult) -> Vec<Finding> {
    let mut groups: IndexMap<&str, Vec<String>> = IndexMap::new();
    for item in revised_side(recon) {
        groups
            .entry(item.item.normalized_description.as_str())
            .or_default()
            .push(item.id().to_string());
    }

    groups
        .into_iter()
        .filter(|(description, ids)| ids.len() > 1 && !description.is_empty())
        .map(|(description, ids)| {
            let detail = format!("'{description}' billed {} times on the revised estimate", ids.len());
            (PatternKind::DuplicateDescription, Severity::Medium, ids, detail)
        })
        .collect()
}

fn round_number_bias(recon: &ReconciliationResult) -> Vec<Finding> {
    let changed: Vec<&ClassifiedLineItem> = recon
        .matched_pairs
        .iter()
        .filter(|p| p.variance_detail.change_type != ChangeType::Unchanged)
        .map(|p| &p.revised)
        .chain(recon.new_supplement_items.iter())
        .collect();

    if changed.len() < ROUND_NUMBER_MIN_ITEMS {
        return Vec::new();
    }

    let round: Vec<String> = changed
        .iter()
        .filter(|item| is_round_price(&item.item.unit_price))
        .map(|item| item.id().to_string())
        .collect();

    if round.len() * 100 <= ROUND_NUMBER_SHARE * changed.len() {
        return Vec::new();
    }

    let detail = format!(
        "{} of {} changed items priced on exact multiples of 10",
        round.len(),
        changed.len()
    );
    vec![(PatternKind::RoundNumberBias, Severity::Medium, round, detail)]
}

fn is_round_price(price: &BigDecimal) -> bool {
    if *price <= BigDecimal::zero() {
        return false;
    }
    let ten = BigDecimal::from(10);
    let whole_tens = (price / &ten).with_scale(0);
    whole_tens * ten == *price
}

/// OEM lines replaced by an aftermarket line billed at or above the OEM unit
/// price. Checks matched pairs, then pairs each unmatched OEM original with
/// the most similar unused aftermarket item among the new ones.
fn oem_to_aftermarket(recon: &ReconciliationResult, threshold: f64) -> Vec<Finding> {
    let matched = recon
        .matched_pairs
        .iter()
        .filter(|p| is_oem(&p.original) && is_aftermarket(&p.revised))
        .map(|p: &MatchedPair| (&p.original, &p.revised));

    let mut taken = vec![false; recon.new_supplement_items.len()];
    let mut unmatched = Vec::new();
    for original in recon.unmatched_original.iter().filter(|o| is_oem(o)) {
        let base = strip_sourcing(&original.item.normalized_description);
        if base.is_empty() {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for (idx, revised) in recon.new_supplement_items.iter().enumerate() {
            if taken[idx] || !is_aftermarket(revised) {
                continue;
            }
            let similarity =
                fuzzy_similarity(&base, &strip_sourcing(&revised.item.normalized_description));
            if similarity >= threshold && best.map_or(true, |(_, s)| similarity > s) {
                best = Some((idx, similarity));
            }
        }
        if let Some((idx, _)) = best {
            taken[idx] = true;
            unmatched.push((original, &recon.new_supplement_items[idx]));
        }
    }

    matched
        .chain(unmatched)
        .filter(|(original, revised)| revised.item.unit_price >= original.item.unit_price)
        .map(|(original, revised)| {
            let detail = format!(
                "'{}' switched from OEM to aftermarket but billed at {} (OEM price {})",
                revised.item.description, revised.item.unit_price, original.item.unit_price
            );
            (
                PatternKind::OemToAftermarketAtOemRate,
                Severity::High,
                vec![original.id().to_string(), revised.id().to_string()],
                detail,
            )
        })
        .collect()
}

/// Drop sourcing words so "front bumper cover aftermarket" reads as the
/// OEM line it replaces.
fn strip_sourcing(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .filter(|w| !SOURCING_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_oem(item: &ClassifiedLineItem) -> bool {
    let hinted = item
        .item
        .category_key()
        .is_some_and(|c| OEM_HINTS.contains(&c.as_str()));
    let padded = format!(" {} ", item.item.normalized_description);
    hinted || padded.contains(" oem ") || padded.contains(" genuine ")
}

fn is_aftermarket(item: &ClassifiedLineItem) -> bool {
    let hinted = item
        .item
        .category_key()
        .is_some_and(|c| AFTERMARKET_HINTS.contains(&c.as_str()));
    let padded = format!(" {} ", item.item.normalized_description);
    hinted || padded.contains(" aftermarket ") || padded.contains(" capa ")
}

fn excessive_labor_hours(recon: &ReconciliationResult) -> Vec<Finding> {
    revised_side(recon)
        .into_iter()
        .filter_map(|item| {
            let hours = item.item.labor_hours.as_ref()?;
            let cap = keywords::labor_hour_cap(item.vehicle_system);
            if *hours <= BigDecimal::from(cap) {
                return None;
            }
            let detail = format!(
                "'{}' bills {} labor hours; {:?} work rarely exceeds {} on one line",
                item.item.description, hours, item.vehicle_system, cap
            );
            Some((
                PatternKind::ExcessiveLaborHours,
                Severity::High,
                vec![item.id().to_string()],
                detail,
            ))
        })
        .collect()
}

fn rarely_damaged_components(recon: &ReconciliationResult) -> Vec<Finding> {
    let increased = recon
        .matched_pairs
        .iter()
        .filter(|p| p.revised.item.total > p.original.item.total)
        .map(|p| &p.revised);

    recon
        .new_supplement_items
        .iter()
        .chain(increased)
        .filter_map(|item| {
            let component = keywords::rarely_damaged_component(&item.item.normalized_description)?;
            let detail = format!(
                "'{}' charges for a {component}, rarely damaged in a collision",
                item.item.description
            );
            Some((
                PatternKind::RarelyDamagedComponent,
                Severity::Medium,
                vec![item.id().to_string()],
                detail,
            ))
        })
        .collect()
}
