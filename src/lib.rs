pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod money;
pub mod service;

pub use config::AppConfig;
pub use error::{AnalysisError, AnalysisResult};
pub use service::{analyze, analyze_with_options, AnalysisContext, ComparisonService};
