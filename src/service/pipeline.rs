use crate::error::AnalysisResult;
use crate::models::{
    AnalysisSummary, ComparisonAnalysis, ComparisonOptions, RawLineItem, Side,
};
use crate::money;
use crate::service::classifier::classify_all;
use crate::service::context::AnalysisContext;
use crate::service::discrepancies::build_discrepancies;
use crate::service::matcher::reconcile;
use crate::service::normalizer::normalize;
use crate::service::risk::assess_risk;
use crate::service::variance::analyze_variance;

/// Run one comparison: normalize, classify, reconcile, analyze, score.
///
/// Pure over its inputs; everything mutable lives in `ctx`.
pub fn analyze(
    original: &[RawLineItem],
    revised: &[RawLineItem],
    ctx: &mut AnalysisContext,
) -> AnalysisResult<ComparisonAnalysis> {
    ctx.options().validate()?;
    let scale = ctx.scale();

    tracing::info!(
        "[{}] comparing {} original / {} revised records",
        ctx.analysis_id(),
        original.len(),
        revised.len()
    );

    // 1. normalize
    let normalized = normalize(original, revised, ctx)?;
    let rejected_record_count = normalized.rejected_count();
    let mut issues = normalized.issues;

    // 2. classify
    let original_items = classify_all(normalized.original, Side::Original, scale, &mut issues);
    let revised_items = classify_all(normalized.revised, Side::Revised, scale, &mut issues);

    // 3. reconcile
    let outcome = reconcile(&original_items, &revised_items, ctx)?;
    issues.extend(outcome.issues);
    let reconciliation = outcome.result;

    // 4. variance, patterns, discrepancies
    let statistics = analyze_variance(&reconciliation, ctx);
    let discrepancies = build_discrepancies(&reconciliation, &statistics, ctx);

    // 5. risk
    let risk = assess_risk(&statistics, &discrepancies, &issues);

    let summary = AnalysisSummary {
        original_item_count: original_items.len(),
        revised_item_count: revised_items.len(),
        original_total: money::sum(original_items.iter().map(|i| &i.item.total)),
        revised_total: money::sum(revised_items.iter().map(|i| &i.item.total)),
        rejected_record_count,
    };

    tracing::info!(
        "[{}] done: variance {}, {} discrepancies, risk {:?}",
        ctx.analysis_id(),
        statistics.total_variance,
        discrepancies.len(),
        risk.risk_level
    );

    Ok(ComparisonAnalysis {
        analysis_id: ctx.analysis_id(),
        options: ctx.options().clone(),
        summary,
        original_items,
        revised_items,
        reconciliation,
        statistics,
        discrepancies,
        data_quality_issues: issues,
        risk,
    })
}

/// `analyze` with a fresh context.
pub fn analyze_with_options(
    original: &[RawLineItem],
    revised: &[RawLineItem],
    options: ComparisonOptions,
) -> AnalysisResult<ComparisonAnalysis> {
    let mut ctx = AnalysisContext::new(options);
    analyze(original, revised, &mut ctx)
}
