//! One-to-one reconciliation of original and revised line items.
//!
//! Items live in two flat arrays; the assignment is an index map
//! (`original_taken`, `assigned`). The similarity matrix is built in parallel,
//! the assignment is resolved on one thread over a fully ordered candidate
//! list so the result does not depend on how the matrix was built.

use rayon::prelude::*;

use crate::error::AnalysisResult;
use crate::models::{
    ClassifiedLineItem, DataQualityIssue, DataQualityKind, MatchCriteria, MatchedPair,
    ReconciliationResult, Side,
};
use crate::money;
use crate::service::context::AnalysisContext;
use crate::service::similarity::score_pair;
use crate::service::variance::pair_variance;

/// Scores closer than this to the accepted one make a match ambiguous.
pub const TIE_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone)]
struct Cell {
    score: f64,
    criteria: MatchCriteria,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f64,
    revised: usize,
    original: usize,
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub result: ReconciliationResult,
    pub issues: Vec<DataQualityIssue>,
}

/// Pair revised items with originals, best score first.
pub fn reconcile(
    original: &[ClassifiedLineItem],
    revised: &[ClassifiedLineItem],
    ctx: &AnalysisContext,
) -> AnalysisResult<MatchOutcome> {
    let options = ctx.options();
    let threshold = options.fuzzy_threshold;

    ctx.check_cancelled()?;
    let matrix = build_matrix(original, revised, ctx);
    ctx.check_cancelled()?;

    let candidates = ordered_candidates(&matrix, original, revised, threshold);

    let mut original_taken = vec![false; original.len()];
    let mut assigned: Vec<Option<usize>> = vec![None; revised.len()];
    let mut pairs = Vec::new();
    let mut issues = Vec::new();

    for candidate in &candidates {
        if original_taken[candidate.original] || assigned[candidate.revised].is_some() {
            continue;
        }

        let ambiguous = has_rival(&matrix[candidate.revised], candidate, &original_taken);
        if ambiguous {
            issues.push(DataQualityIssue {
                kind: DataQualityKind::MatchingAmbiguity,
                side: Side::Revised,
                item_id: Some(revised[candidate.revised].id().to_string()),
                detail: format!(
                    "several originals scored {:.4}; paired with '{}' by id order, review manually",
                    candidate.score,
                    original[candidate.original].id()
                ),
            });
        }

        original_taken[candidate.original] = true;
        assigned[candidate.revised] = Some(candidate.original);

        let o = &original[candidate.original];
        let r = &revised[candidate.revised];
        pairs.push(MatchedPair {
            original: o.clone(),
            revised: r.clone(),
            match_score: candidate.score,
            match_criteria: matrix[candidate.revised][candidate.original].criteria.clone(),
            variance_detail: pair_variance(&o.item, &r.item, ctx.scale()),
            ambiguous,
        });
    }

    let unmatched_original: Vec<ClassifiedLineItem> = original
        .iter()
        .zip(&original_taken)
        .filter(|(_, taken)| !**taken)
        .map(|(item, _)| item.clone())
        .collect();
    let new_supplement_items: Vec<ClassifiedLineItem> = revised
        .iter()
        .zip(&assigned)
        .filter(|(_, slot)| slot.is_none())
        .map(|(item, _)| item.clone())
        .collect();

    let matching_accuracy = if pairs.is_empty() {
        0.0
    } else {
        let total: f64 = pairs.iter().map(|p| p.match_score).sum();
        money::round_score(total / pairs.len() as f64)
    };
    let item_count = original.len() + revised.len();
    let match_rate = if item_count == 0 {
        0.0
    } else {
        money::round_score((2 * pairs.len()) as f64 / item_count as f64)
    };

    tracing::info!(
        "reconciled {} original / {} revised: {} matched, {} removed, {} new, {} ambiguous",
        original.len(),
        revised.len(),
        pairs.len(),
        unmatched_original.len(),
        new_supplement_items.len(),
        issues.len()
    );

    Ok(MatchOutcome {
        result: ReconciliationResult {
            matched_pairs: pairs,
            unmatched_original,
            new_supplement_items,
            matching_accuracy,
            match_rate,
        },
        issues,
    })
}

/// `matrix[r][o]` scores revised item `r` against original item `o`.
fn build_matrix(
    original: &[ClassifiedLineItem],
    revised: &[ClassifiedLineItem],
    ctx: &AnalysisContext,
) -> Vec<Vec<Cell>> {
    let algorithm = ctx.options().matching_algorithm;
    let cancellation = ctx.cancellation();

    revised
        .par_iter()
        .map(|r| {
            if cancellation.is_cancelled() {
                return Vec::new();
            }
            original
                .iter()
                .map(|o| {
                    let (score, criteria) = score_pair(o, r, algorithm);
                    Cell { score, criteria }
                })
                .collect()
        })
        .collect()
}

/// Every pair at or above the threshold, best first; ties fall back to
/// revised id, then original id.
fn ordered_candidates(
    matrix: &[Vec<Cell>],
    original: &[ClassifiedLineItem],
    revised: &[ClassifiedLineItem],
    threshold: f64,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = matrix
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.iter().enumerate().filter_map(move |(o, cell)| {
                (cell.score >= threshold).then_some(Candidate {
                    score: cell.score,
                    revised: r,
                    original: o,
                })
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| revised[a.revised].id().cmp(revised[b.revised].id()))
            .then_with(|| original[a.original].id().cmp(original[b.original].id()))
    });
    candidates
}

/// Another free original scored within epsilon of the accepted one.
fn has_rival(row: &[Cell], accepted: &Candidate, original_taken: &[bool]) -> bool {
    row.iter().enumerate().any(|(o, cell)| {
        o != accepted.original
            && !original_taken[o]
            && (cell.score - accepted.score).abs() <= TIE_EPSILON
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonOptions, LineItem, MatchingAlgorithm};
    use crate::service::classifier::classify;
    use crate::service::context::CancellationFlag;
    use crate::service::similarity::normalize_description;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn classified(id: &str, description: &str, price: &str, category: Option<&str>) -> ClassifiedLineItem {
        let item = LineItem {
            id: id.into(),
            description: description.into(),
            normalized_description: normalize_description(description),
            quantity: BigDecimal::from(1),
            unit_price: BigDecimal::from_str(price).unwrap(),
            total: BigDecimal::from_str(price).unwrap(),
            operation_code: None,
            part_number: None,
            labor_hours: None,
            labor_rate: None,
            category: category.map(str::to_string),
        };
        classify(item, Side::Original, 2, &mut Vec::new())
    }

    fn ctx() -> AnalysisContext {
        AnalysisContext::new(ComparisonOptions::default())
    }

    #[test]
    fn exact_descriptions_pair_up() {
        let original = vec![
            classified("o1", "Front Bumper", "100", None),
            classified("o2", "Hood", "400", None),
        ];
        let revised = vec![
            classified("r1", "Hood", "450", None),
            classified("r2", "front bumper", "150", None),
            classified("r3", "Grille", "80", None),
        ];
        let out = reconcile(&original, &revised, &ctx()).unwrap().result;

        assert_eq!(out.matched_pairs.len(), 2);
        assert_eq!(out.new_supplement_items.len(), 1);
        assert_eq!(out.new_supplement_items[0].id(), "r3");
        assert!(out.unmatched_original.is_empty());
        assert!(out.matched_pairs.iter().all(|p| p.match_score == 1.0));
        // equal scores resolve by revised id
        assert_eq!(out.matched_pairs[0].revised.id(), "r1");
        assert_eq!(out.matched_pairs[0].original.id(), "o2");
        assert_eq!(out.matching_accuracy, 1.0);
        assert_eq!(out.match_rate, 0.8);
    }

    #[test]
    fn conflicting_categories_with_price_gap_do_not_match() {
        let original = vec![classified("o1", "Door trim", "100", Some("OEM"))];
        let revised = vec![classified("r1", "Door trim", "300", Some("labor"))];
        let out = reconcile(&original, &revised, &ctx()).unwrap().result;

        assert!(out.matched_pairs.is_empty());
        assert_eq!(out.unmatched_original.len(), 1);
        assert_eq!(out.new_supplement_items.len(), 1);
    }

    #[test]
    fn each_original_is_consumed_once() {
        let original = vec![classified("o1", "Hood", "400", None)];
        let revised = vec![
            classified("r1", "Hood", "400", None),
            classified("r2", "Hood", "400", None),
        ];
        let out = reconcile(&original, &revised, &ctx()).unwrap().result;
        assert_eq!(out.matched_pairs.len(), 1);
        assert_eq!(out.matched_pairs[0].revised.id(), "r1");
        assert_eq!(out.new_supplement_items[0].id(), "r2");
    }

    #[test]
    fn ties_are_flagged_ambiguous() {
        let original = vec![
            classified("o1", "Hood", "400", None),
            classified("o2", "Hood", "400", None),
        ];
        let revised = vec![classified("r1", "Hood", "400", None)];
        let outcome = reconcile(&original, &revised, &ctx()).unwrap();
        let pair = &outcome.result.matched_pairs[0];
        assert!(pair.ambiguous);
        assert_eq!(pair.original.id(), "o1");
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].kind, DataQualityKind::MatchingAmbiguity);
    }

    #[test]
    fn fuzzy_mode_tolerates_typos() {
        let opts = ComparisonOptions {
            matching_algorithm: MatchingAlgorithm::Fuzzy,
            ..Default::default()
        };
        let ctx = AnalysisContext::new(opts);
        let original = vec![classified("o1", "Front bumper cover", "300", None)];
        let revised = vec![classified("r1", "Frnt bumper cover", "320", None)];
        let out = reconcile(&original, &revised, &ctx).unwrap().result;
        assert_eq!(out.matched_pairs.len(), 1);
        assert!(out.matched_pairs[0].match_score < 1.0);
        assert!(out.matched_pairs[0].match_score >= 0.7);
    }

    #[test]
    fn exact_mode_ignores_near_misses() {
        let opts = ComparisonOptions {
            matching_algorithm: MatchingAlgorithm::Exact,
            ..Default::default()
        };
        let ctx = AnalysisContext::new(opts);
        let original = vec![classified("o1", "Front bumper cover", "300", None)];
        let revised = vec![classified("r1", "Frnt bumper cover", "300", None)];
        let out = reconcile(&original, &revised, &ctx).unwrap().result;
        assert!(out.matched_pairs.is_empty());
    }

    #[test]
    fn cancelled_before_matrix() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let ctx = ctx().with_cancellation(flag);
        let original = vec![classified("o1", "Hood", "400", None)];
        let err = reconcile(&original, &[], &ctx).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }
}
