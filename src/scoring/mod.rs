//! Scoring: external trec_eval wrapper, in-process fallback metrics,
//! custom metrics, and KPI analysis.

pub mod custom;
pub mod fallback;
pub mod kpi;
pub mod trec_eval;

pub use custom::{compute_coverage_stats, compute_hitrate_at_k, CoverageStats};
pub use fallback::evaluate_fallback;
pub use kpi::KpiAnalyzer;
pub use trec_eval::TrecEval;
