use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::{
    ClassifiedLineItem, DataQualityIssue, Discrepancy, ReconciliationResult, RiskAssessment,
    VarianceStatistics,
};
use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingAlgorithm {
    /// Identical normalized descriptions only.
    Exact,
    /// Description similarity alone.
    Fuzzy,
    /// Weighted description, category and price score.
    #[default]
    Hybrid,
}

/// Per-comparison tuning. Every field has a default so callers may omit any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonOptions {
    pub matching_algorithm: MatchingAlgorithm,
    /// Minimum match score for a pair to be accepted.
    pub fuzzy_threshold: f64,
    /// Changes below this absolute percent are not reported as discrepancies.
    pub significance_threshold_percent: f64,
    /// Decimal places for money, 2 to 4.
    pub calculation_precision: u32,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            matching_algorithm: MatchingAlgorithm::Hybrid,
            fuzzy_threshold: 0.7,
            significance_threshold_percent: 5.0,
            calculation_precision: 2,
        }
    }
}

impl ComparisonOptions {
    pub fn validate(&self) -> AnalysisResult<()> {
        if !self.fuzzy_threshold.is_finite() || !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(AnalysisError::InvalidOptions(format!(
                "fuzzy_threshold must be within [0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        if !self.significance_threshold_percent.is_finite()
            || self.significance_threshold_percent < 0.0
        {
            return Err(AnalysisError::InvalidOptions(format!(
                "significance_threshold_percent must be a non-negative number, got {}",
                self.significance_threshold_percent
            )));
        }
        if !(2..=4).contains(&self.calculation_precision) {
            return Err(AnalysisError::InvalidOptions(format!(
                "calculation_precision must be 2, 3 or 4, got {}",
                self.calculation_precision
            )));
        }
        Ok(())
    }

    pub fn scale(&self) -> i64 {
        i64::from(self.calculation_precision)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub original_item_count: usize,
    pub revised_item_count: usize,
    pub original_total: BigDecimal,
    pub revised_total: BigDecimal,
    pub rejected_record_count: usize,
}

/// Everything one comparison produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonAnalysis {
    pub analysis_id: String,
    pub options: ComparisonOptions,
    pub summary: AnalysisSummary,
    pub original_items: Vec<ClassifiedLineItem>,
    pub revised_items: Vec<ClassifiedLineItem>,
    pub reconciliation: ReconciliationResult,
    pub statistics: VarianceStatistics,
    pub discrepancies: Vec<Discrepancy>,
    pub data_quality_issues: Vec<DataQualityIssue>,
    pub risk: RiskAssessment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ComparisonOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_options() {
        let opts = ComparisonOptions {
            fuzzy_threshold: 1.5,
            ..Default::default()
        };
        assert_eq!(opts.validate().unwrap_err().kind(), "invalid_options");

        let opts = ComparisonOptions {
            calculation_precision: 6,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = ComparisonOptions {
            significance_threshold_percent: f64::NAN,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn partial_options_fill_defaults() {
        let opts: ComparisonOptions =
            serde_json::from_str(r#"{"matching_algorithm":"exact"}"#).unwrap();
        assert_eq!(opts.matching_algorithm, MatchingAlgorithm::Exact);
        assert_eq!(opts.fuzzy_threshold, 0.7);
        assert_eq!(opts.calculation_precision, 2);
    }
}
