//! End-to-end comparisons through the public `analyze` API.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use supplement_audit::models::{
    ChangeType, ChargeType, ComparisonAnalysis, ComparisonOptions, DataQualityKind,
    DiscrepancyKind, MatchingAlgorithm, PatternKind, RawLineItem,
};
use supplement_audit::money;
use supplement_audit::service::AnalysisContext;
use supplement_audit::{analyze, analyze_with_options, AnalysisError};

fn d(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn items(value: Value) -> Vec<RawLineItem> {
    serde_json::from_value(value).unwrap()
}

fn run(original: Value, revised: Value) -> ComparisonAnalysis {
    analyze_with_options(&items(original), &items(revised), ComparisonOptions::default()).unwrap()
}

fn claim_original() -> Value {
    json!([
        {"id": "o1", "description": "Front Bumper Cover", "operation_code": "replace",
         "part_number": "BC-1", "quantity": 1, "unit_price": 450, "total": 450,
         "labor_hours": 2, "labor_rate": 50},
        {"id": "o2", "description": "Refinish Hood", "quantity": 2.5, "unit_price": 58,
         "total": 145, "labor_hours": 2.5, "category": "refinish"},
        {"id": "o3", "description": "Headlamp Assembly LH", "quantity": 1, "unit_price": 350,
         "total": 350},
        {"id": "o4", "description": "Paint Materials", "quantity": 1, "unit_price": 120,
         "total": 120},
    ])
}

fn claim_revised() -> Value {
    json!([
        {"id": "r1", "description": "Front Bumper Cover", "operation_code": "replace",
         "part_number": "BC-1", "quantity": 1, "unit_price": 520, "total": 520,
         "labor_hours": 2, "labor_rate": 50},
        {"id": "r2", "description": "Refinish Hood", "quantity": 2.5, "unit_price": 58,
         "total": 145, "labor_hours": 2.5, "category": "refinish"},
        {"id": "r3", "description": "Headlamp Assy LH", "quantity": 1, "unit_price": 360,
         "total": 360},
        {"id": "r4", "description": "Sublet Wheel Alignment", "quantity": 1,
         "unit_price": 89.95, "total": 89.95},
        {"id": "r5", "description": "Radiator Support", "quantity": 1, "unit_price": 275,
         "total": 275},
    ])
}

#[test]
fn changed_total_is_matched_and_major() {
    let analysis = run(
        json!([{"id": "1", "description": "Front Bumper", "quantity": 1, "unit_price": 100, "total": 100}]),
        json!([{"id": "1", "description": "Front Bumper", "quantity": 1, "unit_price": 150, "total": 150}]),
    );

    let recon = &analysis.reconciliation;
    assert_eq!(recon.matched_pairs.len(), 1);
    assert!(recon.unmatched_original.is_empty());
    assert!(recon.new_supplement_items.is_empty());
    assert_eq!(recon.matched_pairs[0].match_score, 1.0);

    assert_eq!(analysis.statistics.total_variance, d("50"));
    assert_eq!(analysis.statistics.total_variance_percent, Some(d("50")));
    assert_eq!(
        serde_json::to_value(recon.matched_pairs[0].variance_detail.significance).unwrap(),
        json!("major")
    );
    assert_eq!(analysis.discrepancies.len(), 1);
    assert_eq!(analysis.discrepancies[0].kind, DiscrepancyKind::TotalChange);
    assert_eq!(analysis.discrepancies[0].id, "D-0001");
}

#[test]
fn empty_original_makes_every_item_new() {
    let analysis = run(
        json!([]),
        json!([{"id": "n1", "description": "New Part", "quantity": 1, "unit_price": 200, "total": 200}]),
    );

    let recon = &analysis.reconciliation;
    assert!(recon.matched_pairs.is_empty());
    assert_eq!(recon.new_supplement_items.len(), 1);
    assert_eq!(analysis.statistics.total_variance, d("200"));
    assert_eq!(analysis.statistics.total_variance_percent, None);
    assert_eq!(analysis.discrepancies[0].kind, DiscrepancyKind::NewItem);
}

#[test]
fn replacement_with_explicit_rate_is_split_and_validated() {
    let analysis = run(
        json!([{"id": "p1", "description": "Quarter Panel", "operation_code": "replace",
                "part_number": "ABC123", "quantity": 1, "unit_price": 500, "total": 500,
                "labor_hours": 2, "labor_rate": 100}]),
        json!([]),
    );

    let item = &analysis.original_items[0];
    assert_eq!(item.charge_type, ChargeType::PartWithLabor);
    assert_eq!(item.cost_breakdown.labor_cost, d("200"));
    assert_eq!(item.cost_breakdown.part_cost, d("300"));
    assert!(item.cost_breakdown.is_validated);
}

#[test]
fn conflicting_categories_and_prices_do_not_match() {
    let analysis = run(
        json!([{"id": "a", "description": "Door Shell", "category": "OEM", "quantity": 1,
                "unit_price": 100, "total": 100}]),
        json!([{"id": "b", "description": "Door Shell", "category": "Aftermarket", "quantity": 1,
                "unit_price": 300, "total": 300}]),
    );

    let recon = &analysis.reconciliation;
    assert!(recon.matched_pairs.is_empty());
    assert_eq!(recon.unmatched_original[0].id(), "a");
    assert_eq!(recon.new_supplement_items[0].id(), "b");
}

#[test]
fn reconciliation_partitions_both_sides() {
    let analysis = run(claim_original(), claim_revised());
    let recon = &analysis.reconciliation;

    let mut original_seen: HashMap<&str, usize> = HashMap::new();
    let mut revised_seen: HashMap<&str, usize> = HashMap::new();
    for pair in &recon.matched_pairs {
        *original_seen.entry(pair.original.id()).or_default() += 1;
        *revised_seen.entry(pair.revised.id()).or_default() += 1;
    }
    for item in &recon.unmatched_original {
        *original_seen.entry(item.id()).or_default() += 1;
    }
    for item in &recon.new_supplement_items {
        *revised_seen.entry(item.id()).or_default() += 1;
    }

    assert_eq!(original_seen.len(), 4);
    assert!(original_seen.values().all(|&n| n == 1));
    assert_eq!(revised_seen.len(), 5);
    assert!(revised_seen.values().all(|&n| n == 1));

    let matched: Vec<(&str, &str)> = recon
        .matched_pairs
        .iter()
        .map(|p| (p.original.id(), p.revised.id()))
        .collect();
    assert!(matched.contains(&("o1", "r1")));
    assert!(matched.contains(&("o2", "r2")));
}

#[test]
fn total_variance_equals_difference_of_sides() {
    let analysis = run(claim_original(), claim_revised());
    let recon = &analysis.reconciliation;

    let revised_side = money::sum(
        recon
            .matched_pairs
            .iter()
            .map(|p| &p.revised.item.total)
            .chain(recon.new_supplement_items.iter().map(|i| &i.item.total)),
    );
    let original_side = money::sum(
        recon
            .matched_pairs
            .iter()
            .map(|p| &p.original.item.total)
            .chain(recon.unmatched_original.iter().map(|i| &i.item.total)),
    );

    assert_eq!(analysis.statistics.total_variance, &revised_side - &original_side);
    assert_eq!(
        analysis.statistics.total_variance,
        &analysis.summary.revised_total - &analysis.summary.original_total
    );
    // 1389.95 - 1065.00
    assert_eq!(analysis.statistics.total_variance, d("324.95"));
}

#[test]
fn accepted_scores_respect_threshold() {
    for (algorithm, threshold) in [
        (MatchingAlgorithm::Hybrid, 0.7),
        (MatchingAlgorithm::Fuzzy, 0.6),
        (MatchingAlgorithm::Exact, 0.5),
    ] {
        let options = ComparisonOptions {
            matching_algorithm: algorithm,
            fuzzy_threshold: threshold,
            ..Default::default()
        };
        let analysis =
            analyze_with_options(&items(claim_original()), &items(claim_revised()), options)
                .unwrap();
        for pair in &analysis.reconciliation.matched_pairs {
            assert!((0.0..=1.0).contains(&pair.match_score));
            assert!(pair.match_score >= threshold, "{algorithm:?}: {}", pair.match_score);
        }
    }
}

#[test]
fn fuzzy_mode_pairs_abbreviated_descriptions() {
    let options = ComparisonOptions {
        matching_algorithm: MatchingAlgorithm::Fuzzy,
        ..Default::default()
    };
    let analysis =
        analyze_with_options(&items(claim_original()), &items(claim_revised()), options).unwrap();

    let headlamp = analysis
        .reconciliation
        .matched_pairs
        .iter()
        .find(|p| p.original.id() == "o3")
        .expect("headlamp should pair in fuzzy mode");
    assert_eq!(headlamp.revised.id(), "r3");
    assert_eq!(headlamp.variance_detail.change_type, ChangeType::PriceChanged);
}

#[test]
fn validated_breakdowns_sum_to_total() {
    let analysis = run(claim_original(), claim_revised());
    let cent = money::cent();
    for item in analysis.original_items.iter().chain(&analysis.revised_items) {
        if item.cost_breakdown.is_validated {
            assert!(
                money::within_tolerance(&item.cost_breakdown.component_sum(), &item.item.total, &cent),
                "{} breakdown does not sum to {}",
                item.id(),
                item.item.total
            );
        }
    }
}

#[test]
fn identical_input_gives_identical_output() {
    let original = items(claim_original());
    let revised = items(claim_revised());

    let mut first_ctx = AnalysisContext::new(ComparisonOptions::default()).with_label("claim-42");
    let mut second_ctx = AnalysisContext::new(ComparisonOptions::default()).with_label("claim-42");
    let first = analyze(&original, &revised, &mut first_ctx).unwrap();
    let second = analyze(&original, &revised, &mut second_ctx).unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn input_order_does_not_change_reconciliation() {
    let original = items(claim_original());
    let mut revised = items(claim_revised());
    let forward = analyze_with_options(&original, &revised, ComparisonOptions::default()).unwrap();

    revised.reverse();
    let mut shuffled_original = original.clone();
    shuffled_original.rotate_left(2);
    let backward =
        analyze_with_options(&shuffled_original, &revised, ComparisonOptions::default()).unwrap();

    assert_eq!(
        serde_json::to_value(&forward.reconciliation).unwrap(),
        serde_json::to_value(&backward.reconciliation).unwrap()
    );
    assert_eq!(
        serde_json::to_value(&forward.statistics).unwrap(),
        serde_json::to_value(&backward.statistics).unwrap()
    );
}

#[test]
fn nothing_valid_on_either_side_is_insufficient_data() {
    let err = analyze_with_options(
        &items(json!([{"id": "x", "description": "Hood", "quantity": "abc", "unit_price": 1, "total": 1}])),
        &items(json!([{"description": "no id", "quantity": 1, "unit_price": 1, "total": 1}])),
        ComparisonOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::InsufficientData {
            original_rejected: 1,
            revised_rejected: 1
        }
    ));
    assert_eq!(err.kind(), "insufficient_data");
}

#[test]
fn invalid_records_are_dropped_and_reported() {
    let analysis = run(
        json!([
            {"id": "ok", "description": "Hood", "quantity": 1, "unit_price": 400, "total": 400},
            {"id": "bad", "description": "Fender", "quantity": 1, "unit_price": 200, "total": "NaN"},
        ]),
        json!([{"id": "ok", "description": "Hood", "quantity": 1, "unit_price": 400, "total": 400}]),
    );

    assert_eq!(analysis.summary.original_item_count, 1);
    assert_eq!(analysis.summary.rejected_record_count, 1);
    assert!(analysis
        .data_quality_issues
        .iter()
        .any(|i| i.kind == DataQualityKind::InvalidInput && i.item_id.as_deref() == Some("bad")));
}

#[test]
fn unchanged_estimate_is_low_risk() {
    let analysis = run(claim_original(), claim_original());

    assert_eq!(analysis.reconciliation.matched_pairs.len(), 4);
    assert_eq!(analysis.statistics.total_variance, d("0"));
    assert!(analysis.discrepancies.is_empty());
    assert_eq!(
        serde_json::to_value(analysis.risk.risk_level).unwrap(),
        json!("low")
    );
}

#[test]
fn suspicious_supplement_is_flagged() {
    let analysis = run(
        json!([{"id": "o1", "description": "Hood", "quantity": 1, "unit_price": 400, "total": 400}]),
        json!([
            {"id": "r1", "description": "Hood", "quantity": 1, "unit_price": 400, "total": 400},
            {"id": "r2", "description": "Frame Pull", "quantity": 60, "unit_price": 75,
             "total": 4500, "labor_hours": 60, "labor_rate": 75},
            {"id": "r3", "description": "Transmission", "quantity": 1, "unit_price": 2000,
             "total": 2000},
            {"id": "r4", "description": "Clear Coat", "quantity": 1, "unit_price": 150, "total": 150},
            {"id": "r5", "description": "Clear Coat", "quantity": 1, "unit_price": 150, "total": 150},
        ]),
    );

    let patterns = &analysis.statistics.suspicious_patterns;
    let kinds: Vec<PatternKind> = patterns.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![
            PatternKind::DuplicateDescription,
            PatternKind::RoundNumberBias,
            PatternKind::ExcessiveLaborHours,
            PatternKind::RarelyDamagedComponent,
        ]
    );
    assert_eq!(patterns[0].id, "P-0001");
    assert_eq!(patterns[0].item_ids, vec!["r4".to_string(), "r5".to_string()]);
    assert_eq!(patterns[2].item_ids, vec!["r2".to_string()]);
    assert_eq!(patterns[3].item_ids, vec!["r3".to_string()]);

    // variance capped at 100 -> 40, two critical new items -> 20, four patterns -> 30
    assert_eq!(analysis.statistics.total_variance, d("6800"));
    assert_eq!(analysis.risk.overall_risk_score, d("90"));
    assert_eq!(
        serde_json::to_value(analysis.risk.risk_level).unwrap(),
        json!("critical")
    );
}

#[test]
fn oem_swapped_for_aftermarket_at_oem_price_is_flagged() {
    let original = json!([{"id": "o1", "description": "Front Bumper Cover", "category": "OEM",
                           "quantity": 1, "unit_price": 400, "total": 400}]);
    let hinted = json!([{"id": "r1", "description": "Front Bumper Cover", "category": "Aftermarket",
                         "quantity": 1, "unit_price": 400, "total": 400}]);
    let described = json!([{"id": "r1", "description": "Front Bumper Cover Aftermarket",
                            "quantity": 1, "unit_price": 400, "total": 400}]);

    for algorithm in [MatchingAlgorithm::Hybrid, MatchingAlgorithm::Fuzzy, MatchingAlgorithm::Exact] {
        for revised in [&hinted, &described] {
            let options = ComparisonOptions {
                matching_algorithm: algorithm,
                ..Default::default()
            };
            let analysis =
                analyze_with_options(&items(original.clone()), &items(revised.clone()), options)
                    .unwrap();

            let flagged: Vec<&Vec<String>> = analysis
                .statistics
                .suspicious_patterns
                .iter()
                .filter(|p| p.kind == PatternKind::OemToAftermarketAtOemRate)
                .map(|p| &p.item_ids)
                .collect();
            assert_eq!(
                flagged,
                vec![&vec!["o1".to_string(), "r1".to_string()]],
                "{algorithm:?}"
            );
        }
    }
}

#[test]
fn cheaper_aftermarket_replacement_is_not_flagged() {
    let analysis = run(
        json!([{"id": "o1", "description": "Front Bumper Cover", "category": "OEM",
                "quantity": 1, "unit_price": 400, "total": 400}]),
        json!([{"id": "r1", "description": "Front Bumper Cover", "category": "Aftermarket",
                "quantity": 1, "unit_price": 250, "total": 250}]),
    );

    assert!(analysis
        .statistics
        .suspicious_patterns
        .iter()
        .all(|p| p.kind != PatternKind::OemToAftermarketAtOemRate));
}
