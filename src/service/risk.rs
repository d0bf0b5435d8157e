use bigdecimal::{BigDecimal, Zero};

use crate::models::{
    DataQualityIssue, Discrepancy, RiskAssessment, RiskFactor, RiskFactorKind, RiskLevel,
    Severity, VarianceStatistics,
};
use crate::money;

const SCORE_SCALE: i64 = 2;

/// Composite 0-100 score.
///
/// Each term is first scaled to 0-100, then weighted 0.4 / 0.3 / 0.3:
/// variance percent capped at 100, critical discrepancies at 20 points each
/// capped at 60, suspicious patterns at 15 points each capped at 30.
pub fn assess_risk(
    stats: &VarianceStatistics,
    discrepancies: &[Discrepancy],
    issues: &[DataQualityIssue],
) -> RiskAssessment {
    let critical = discrepancies
        .iter()
        .filter(|d| d.severity == Severity::Critical)
        .count();
    let patterns = stats.suspicious_patterns.len();

    let variance_term = variance_term(stats);
    let critical_term = scaled_count(critical, 20, 60);
    let pattern_term = scaled_count(patterns, 15, 30);

    let variance_points = weighted(&variance_term, 4);
    let critical_points = weighted(&critical_term, 3);
    let pattern_points = weighted(&pattern_term, 3);
    let overall_risk_score = money::round_half_up(
        &(&variance_points + &critical_points + &pattern_points),
        SCORE_SCALE,
    );
    let risk_level = level_for(&overall_risk_score);

    let mut risk_factors = Vec::new();
    if variance_points > BigDecimal::zero() {
        risk_factors.push(RiskFactor {
            kind: RiskFactorKind::VarianceMagnitude,
            contribution: money::round_half_up(&variance_points, SCORE_SCALE),
            detail: match &stats.total_variance_percent {
                Some(p) => format!(
                    "estimate total moved by {}% ({})",
                    p, stats.total_variance
                ),
                None => format!("estimate total moved by {} from a zero original", stats.total_variance),
            },
        });
    }
    if critical_points > BigDecimal::zero() {
        risk_factors.push(RiskFactor {
            kind: RiskFactorKind::CriticalDiscrepancies,
            contribution: money::round_half_up(&critical_points, SCORE_SCALE),
            detail: format!("{critical} critical discrepancies"),
        });
    }
    if pattern_points > BigDecimal::zero() {
        let kinds: Vec<String> = stats
            .suspicious_patterns
            .iter()
            .map(|p| format!("{:?}", p.kind))
            .collect();
        risk_factors.push(RiskFactor {
            kind: RiskFactorKind::SuspiciousPatterns,
            contribution: money::round_half_up(&pattern_points, SCORE_SCALE),
            detail: format!("{patterns} suspicious patterns ({})", kinds.join(", ")),
        });
    }
    if !issues.is_empty() {
        risk_factors.push(RiskFactor {
            kind: RiskFactorKind::DataQuality,
            contribution: BigDecimal::zero(),
            detail: format!("{} data-quality issues", issues.len()),
        });
    }

    let mut recommendations = vec![level_recommendation(risk_level).to_string()];
    recommendations.extend(risk_factors.iter().map(factor_recommendation));

    tracing::info!(
        "risk score {} ({:?}), {} factors",
        overall_risk_score,
        risk_level,
        risk_factors.len()
    );

    RiskAssessment {
        overall_risk_score,
        risk_level,
        risk_factors,
        recommendations,
    }
}

/// |variance percent| capped at 100. A change from a zero original counts
/// as the full 100; no change counts as 0.
fn variance_term(stats: &VarianceStatistics) -> BigDecimal {
    let hundred = BigDecimal::from(100);
    match &stats.total_variance_percent {
        Some(p) => p.abs().min(hundred),
        None if stats.total_variance.is_zero() => BigDecimal::zero(),
        None => hundred,
    }
}

/// `min(per_item * count, cap)` rescaled so that `cap` maps to 100.
fn scaled_count(count: usize, per_item: u64, cap: u64) -> BigDecimal {
    let raw = (per_item * count as u64).min(cap);
    BigDecimal::from(raw * 100) / BigDecimal::from(cap)
}

fn weighted(term: &BigDecimal, tenths: u32) -> BigDecimal {
    term * BigDecimal::from(tenths) / BigDecimal::from(10)
}

pub fn level_for(score: &BigDecimal) -> RiskLevel {
    if *score < BigDecimal::from(25) {
        RiskLevel::Low
    } else if *score < BigDecimal::from(50) {
        RiskLevel::Medium
    } else if *score < BigDecimal::from(75) {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

fn level_recommendation(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "Supplement is within normal range; standard review is sufficient.",
        RiskLevel::Medium => {
            "Review changed and added line items against damage photos before approval."
        }
        RiskLevel::High => {
            "Escalate to a senior reviewer and confirm high-variance items with the repair facility."
        }
        RiskLevel::Critical => {
            "Hold payment pending re-inspection of the vehicle and supporting documentation."
        }
    }
}

fn factor_recommendation(factor: &RiskFactor) -> String {
    match factor.kind {
        RiskFactorKind::VarianceMagnitude => format!(
            "Variance: {}; confirm every supplemental charge is supported.",
            factor.detail
        ),
        RiskFactorKind::CriticalDiscrepancies => format!(
            "Discrepancies: {}; obtain documentation for each before approval.",
            factor.detail
        ),
        RiskFactorKind::SuspiciousPatterns => format!(
            "Patterns: {}; investigate the flagged items.",
            factor.detail
        ),
        RiskFactorKind::DataQuality => format!(
            "Data quality: {}; verify extracted line items against the source estimates.",
            factor.detail
        ),
    }
}
