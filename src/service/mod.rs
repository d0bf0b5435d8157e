pub mod classifier;
pub mod comparison;
pub mod context;
pub mod discrepancies;
pub mod keywords;
pub mod matcher;
pub mod normalizer;
pub mod patterns;
pub mod pipeline;
pub mod risk;
pub mod similarity;
pub mod variance;

pub use classifier::{classify, classify_all, separate_costs};
pub use comparison::{ComparisonRequest, ComparisonService};
pub use context::{AnalysisContext, CancellationFlag};
pub use discrepancies::build_discrepancies;
pub use matcher::{reconcile, MatchOutcome};
pub use normalizer::{normalize, NormalizedInput};
pub use patterns::detect_patterns;
pub use pipeline::{analyze, analyze_with_options};
pub use risk::assess_risk;
pub use variance::analyze_variance;
