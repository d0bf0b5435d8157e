pub mod analysis;
pub mod classification;
pub mod discrepancy;
pub mod line_item;
pub mod reconciliation;
pub mod risk;
pub mod variance;

pub use analysis::{AnalysisSummary, ComparisonAnalysis, ComparisonOptions, MatchingAlgorithm};
pub use classification::{
    BreakdownMethod, ChargeType, ClassifiedLineItem, CostBreakdown, VehicleSystem,
};
pub use discrepancy::{DataQualityIssue, DataQualityKind, Discrepancy, DiscrepancyKind};
pub use line_item::{LineItem, RawLineItem, Side};
pub use reconciliation::{
    ChangeType, FieldVariance, MatchCriteria, MatchedPair, ReconciliationResult, Significance,
    VarianceDetail,
};
pub use risk::{RiskAssessment, RiskFactor, RiskFactorKind, RiskLevel};
pub use variance::{
    CategoryVariance, ChangeBucket, Dispersion, HighVarianceItem, PatternKind, Severity,
    SuspiciousPattern, VarianceStatistics,
};
