pub mod baselines;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod scoring;

pub use config::Config;
pub use error::{RagevalError, Result};
pub use models::{EvaluationReport, MetricStatus, MetricValue, TrecRun, TrecRunRow};
