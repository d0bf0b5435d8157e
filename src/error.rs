use thiserror::Error;

/// Fatal failures of a comparison. Record-level problems never end up here;
/// they are reported as data-quality issues on the analysis instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Both collections were empty after invalid records were dropped.
    #[error(
        "insufficient data: no valid line items on either side \
         ({original_rejected} original and {revised_rejected} revised records rejected)"
    )]
    InsufficientData {
        original_rejected: usize,
        revised_rejected: usize,
    },

    #[error("invalid comparison options: {0}")]
    InvalidOptions(String),

    /// Cancellation was observed while building the similarity matrix.
    #[error("comparison cancelled")]
    Cancelled,

    #[error("comparison exceeded its {timeout_ms} ms deadline")]
    Timeout { timeout_ms: u64 },

    #[error("comparison worker failed: {0}")]
    Worker(String),
}

impl AnalysisError {
    /// Machine-readable kind for callers that branch on failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::InvalidOptions(_) => "invalid_options",
            Self::Cancelled => "cancelled",
            Self::Timeout { .. } => "timeout",
            Self::Worker(_) => "worker",
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
