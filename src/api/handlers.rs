use crate::error::AnalysisError;
use crate::models::ComparisonAnalysis;
use crate::service::{ComparisonRequest, ComparisonService};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Batch request body
#[derive(Debug, Deserialize)]
pub struct BatchCompareRequest {
    pub comparisons: Vec<ComparisonRequest>,
}

/// Response body for one comparison
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub message: String,
    pub completed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ComparisonAnalysis>,
}

/// Batch response body
#[derive(Debug, Serialize)]
pub struct BatchCompareResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<CompareResponse>,
}

impl CompareResponse {
    fn from_result(result: Result<ComparisonAnalysis, AnalysisError>) -> (StatusCode, Self) {
        match result {
            Ok(analysis) => {
                let response = Self {
                    success: true,
                    message: format!(
                        "Compared {} original / {} revised items, risk {:?}",
                        analysis.summary.original_item_count,
                        analysis.summary.revised_item_count,
                        analysis.risk.risk_level
                    ),
                    completed_at: Utc::now(),
                    error_kind: None,
                    analysis: Some(analysis),
                };
                (StatusCode::OK, response)
            }
            Err(e) => {
                let response = Self {
                    success: false,
                    message: format!("Error: {}", e),
                    completed_at: Utc::now(),
                    error_kind: Some(e.kind()),
                    analysis: None,
                };
                (status_for(&e), response)
            }
        }
    }
}

fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::InsufficientData { .. } | AnalysisError::InvalidOptions(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        AnalysisError::Cancelled | AnalysisError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// Compare one original estimate against its supplement
pub async fn compare(
    State(service): State<Arc<ComparisonService>>,
    Json(req): Json<ComparisonRequest>,
) -> Response {
    let (status, response) = CompareResponse::from_result(service.compare(req).await);
    (status, Json(response)).into_response()
}

/// Compare many claims; results keep request order and fail independently
pub async fn compare_batch(
    State(service): State<Arc<ComparisonService>>,
    Json(req): Json<BatchCompareRequest>,
) -> Response {
    let total = req.comparisons.len();
    let results: Vec<CompareResponse> = service
        .compare_batch(req.comparisons)
        .await
        .into_iter()
        .map(|r| CompareResponse::from_result(r).1)
        .collect();

    let succeeded = results.iter().filter(|r| r.success).count();
    let response = BatchCompareResponse {
        success: succeeded == total,
        message: format!("Compared {} of {} claims", succeeded, total),
        results,
    };
    (StatusCode::OK, Json(response)).into_response()
}
