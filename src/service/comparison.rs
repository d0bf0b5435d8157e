use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ComparisonAnalysis, ComparisonOptions, RawLineItem};
use crate::service::context::{AnalysisContext, CancellationFlag};
use crate::service::pipeline::analyze;

/// One claim to compare.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonRequest {
    #[serde(default)]
    pub claim_id: Option<String>,
    #[serde(default)]
    pub original: Vec<RawLineItem>,
    #[serde(default)]
    pub revised: Vec<RawLineItem>,
    #[serde(default)]
    pub options: Option<ComparisonOptions>,
}

/// Runs comparisons off the async runtime, one blocking task per claim,
/// each under a whole-pipeline deadline.
pub struct ComparisonService {
    defaults: ComparisonOptions,
    timeout_ms: u64,
    limiter: Semaphore,
}

impl ComparisonService {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            defaults: config.defaults.clone(),
            timeout_ms: config.timeout_ms,
            limiter: Semaphore::new(config.max_concurrent.max(1)),
        }
    }

    /// Compare one claim. On timeout the worker is told to stop and no
    /// partial result is returned.
    pub async fn compare(&self, request: ComparisonRequest) -> AnalysisResult<ComparisonAnalysis> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| AnalysisError::Worker(e.to_string()))?;

        let ComparisonRequest {
            claim_id,
            original,
            revised,
            options,
        } = request;
        let options = options.unwrap_or_else(|| self.defaults.clone());
        let label = claim_id.unwrap_or_else(|| "analysis".to_string());

        let cancellation = CancellationFlag::new();
        let worker_flag = cancellation.clone();
        let worker = tokio::task::spawn_blocking(move || {
            let mut ctx = AnalysisContext::new(options)
                .with_label(label)
                .with_cancellation(worker_flag);
            analyze(&original, &revised, &mut ctx)
        });

        self.await_worker(worker, &cancellation).await
    }

    /// Wait for a worker under the deadline; on expiry raise its flag and
    /// drop whatever it would have produced.
    async fn await_worker(
        &self,
        worker: JoinHandle<AnalysisResult<ComparisonAnalysis>>,
        cancellation: &CancellationFlag,
    ) -> AnalysisResult<ComparisonAnalysis> {
        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                tracing::error!("comparison worker failed: {}", join_error);
                Err(AnalysisError::Worker(join_error.to_string()))
            }
            Err(_) => {
                cancellation.cancel();
                tracing::warn!("comparison timed out after {} ms", self.timeout_ms);
                Err(AnalysisError::Timeout {
                    timeout_ms: self.timeout_ms,
                })
            }
        }
    }

    /// Compare many claims concurrently; results keep request order.
    pub async fn compare_batch(
        &self,
        requests: Vec<ComparisonRequest>,
    ) -> Vec<AnalysisResult<ComparisonAnalysis>> {
        let total = requests.len();
        let results =
            futures::future::join_all(requests.into_iter().map(|r| self.compare(r))).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!("batch finished: {} comparisons, {} failed", total, failed);
        results
    }
}
