//! Evaluation report models.

use crate::error::{RagevalError, Result};
use serde::{Deserialize, Serialize};

/// Status of a single metric against its KPI target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Pass,
    Warn,
    Fail,
    Unknown,
}

impl std::fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricStatus::Pass => "pass",
            MetricStatus::Warn => "warn",
            MetricStatus::Fail => "fail",
            MetricStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Single metric value with target comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
    pub target: Option<f64>,
    pub status: MetricStatus,
    pub higher_is_better: bool,
}

/// Per-status tallies over a metric list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
    pub unknown: usize,
}

impl StatusCounts {
    pub fn from_metrics(metrics: &[MetricValue]) -> Self {
        let mut counts = StatusCounts::default();
        for metric in metrics {
            match metric.status {
                MetricStatus::Pass => counts.pass += 1,
                MetricStatus::Warn => counts.warn += 1,
                MetricStatus::Fail => counts.fail += 1,
                MetricStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    /// Overall status by priority: any fail, else any warn, else any pass,
    /// else unknown.
    pub fn overall(&self) -> MetricStatus {
        if self.fail > 0 {
            MetricStatus::Fail
        } else if self.warn > 0 {
            MetricStatus::Warn
        } else if self.pass > 0 {
            MetricStatus::Pass
        } else {
            MetricStatus::Unknown
        }
    }
}

/// Complete evaluation report.
///
/// Construct through [`EvaluationReport::new`] or
/// [`EvaluationReport::from_metrics`]; the status counts and overall status
/// are a checked invariant of the metric list, not free-floating fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: Vec<MetricValue>,
    pub status_counts: StatusCounts,
    pub overall_status: MetricStatus,
}

impl EvaluationReport {
    /// Validating factory: refuses counts or overall status that disagree
    /// with the metric list.
    pub fn new(
        metrics: Vec<MetricValue>,
        status_counts: StatusCounts,
        overall_status: MetricStatus,
    ) -> Result<Self> {
        let expected = StatusCounts::from_metrics(&metrics);
        if status_counts != expected {
            return Err(RagevalError::InvalidReport(format!(
                "status counts {:?} do not match metric list (expected {:?})",
                status_counts, expected
            )));
        }
        if overall_status != expected.overall() {
            return Err(RagevalError::InvalidReport(format!(
                "overall status {} does not match metric list (expected {})",
                overall_status,
                expected.overall()
            )));
        }
        Ok(Self {
            metrics,
            status_counts,
            overall_status,
        })
    }

    /// Build a consistent report directly from a metric list.
    pub fn from_metrics(metrics: Vec<MetricValue>) -> Self {
        let status_counts = StatusCounts::from_metrics(&metrics);
        let overall_status = status_counts.overall();
        Self {
            metrics,
            status_counts,
            overall_status,
        }
    }
}
