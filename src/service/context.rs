use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::ComparisonOptions;

/// Shared flag a caller raises to stop a comparison that is still building
/// its similarity matrix.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State owned by one comparison: options, identity, id counters and the
/// cancellation flag. Never shared between requests.
#[derive(Debug)]
pub struct AnalysisContext {
    options: ComparisonOptions,
    label: String,
    seed: u64,
    discrepancy_seq: u32,
    pattern_seq: u32,
    cancellation: CancellationFlag,
}

impl AnalysisContext {
    pub fn new(options: ComparisonOptions) -> Self {
        Self {
            options,
            label: "analysis".to_string(),
            seed: 0,
            discrepancy_seq: 0,
            pattern_seq: 0,
            cancellation: CancellationFlag::new(),
        }
    }

    /// Label used in the analysis id; the seed is derived from it.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self.seed = stable_hash(&self.label);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    pub fn options(&self) -> &ComparisonOptions {
        &self.options
    }

    /// Money scale for this comparison.
    pub fn scale(&self) -> i64 {
        self.options.scale()
    }

    pub fn analysis_id(&self) -> String {
        format!("{}-{:016x}", self.label, self.seed)
    }

    pub fn next_discrepancy_id(&mut self) -> String {
        self.discrepancy_seq += 1;
        format!("D-{:04}", self.discrepancy_seq)
    }

    pub fn next_pattern_id(&mut self) -> String {
        self.pattern_seq += 1;
        format!("P-{:04}", self.pattern_seq)
    }

    pub fn check_cancelled(&self) -> AnalysisResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }
}

/// FNV-1a; stable across runs and toolchains.
fn stable_hash(value: &str) -> u64 {
    value.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_per_context() {
        let mut a = AnalysisContext::new(ComparisonOptions::default());
        let mut b = AnalysisContext::new(ComparisonOptions::default());
        assert_eq!(a.next_discrepancy_id(), "D-0001");
        assert_eq!(a.next_discrepancy_id(), "D-0002");
        assert_eq!(b.next_discrepancy_id(), "D-0001");
        assert_eq!(a.next_pattern_id(), "P-0001");
    }

    #[test]
    fn label_seed_is_stable() {
        let a = AnalysisContext::new(ComparisonOptions::default()).with_label("claim-7");
        let b = AnalysisContext::new(ComparisonOptions::default()).with_label("claim-7");
        assert_eq!(a.analysis_id(), b.analysis_id());
        assert!(a.analysis_id().starts_with("claim-7-"));
    }

    #[test]
    fn cancellation_is_observed() {
        let flag = CancellationFlag::new();
        let ctx = AnalysisContext::new(ComparisonOptions::default()).with_cancellation(flag.clone());
        assert!(ctx.check_cancelled().is_ok());
        flag.cancel();
        assert_eq!(ctx.check_cancelled().unwrap_err().kind(), "cancelled");
    }
}
