//! KPI analysis: compare system-wide metrics against configured targets.

use crate::config::Config;
use crate::error::Result;
use crate::models::reports::{EvaluationReport, MetricStatus, MetricValue, StatusCounts};
use std::collections::{BTreeMap, HashMap};

/// Display metrics, in report order: raw trec_eval key to display name.
const KEY_METRICS: [(&str, &str); 10] = [
    ("ndcg_cut_10", "nDCG@10"),
    ("ndcg_cut_25", "nDCG@25"),
    ("ndcg_cut_50", "nDCG@50"),
    ("ndcg_cut_100", "nDCG@100"),
    ("map_cut_100", "MAP@100"),
    ("recip_rank", "MRR@10"),
    ("recall_25", "Recall@25"),
    ("recall_50", "Recall@50"),
    ("recall_100", "Recall@100"),
    ("hitrate_10", "HitRate@10"),
];

/// Analyze system-wide metrics against KPI targets.
pub struct KpiAnalyzer {
    targets: BTreeMap<String, f64>,
}

impl KpiAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            targets: config.metrics.targets.clone(),
        }
    }

    pub fn with_targets(targets: BTreeMap<String, f64>) -> Self {
        Self { targets }
    }

    /// Classify each display metric against its target.
    ///
    /// The raw value is looked up under the trec_eval key, falling back to
    /// an "all."-prefixed key, defaulting to 0.0. Higher-is-better is the
    /// only supported mode: missing target means unknown, meeting the target
    /// passes, within 10% below warns, further below fails.
    pub fn analyze(&self, metrics: &HashMap<String, f64>) -> Vec<MetricValue> {
        KEY_METRICS
            .iter()
            .map(|(key, display_name)| {
                let value = metrics
                    .get(*key)
                    .or_else(|| metrics.get(&format!("all.{}", key)))
                    .copied()
                    .unwrap_or(0.0);
                let target = self.targets.get(*key).copied();
                let status = classify(value, target);
                MetricValue {
                    name: display_name.to_string(),
                    value,
                    target,
                    status,
                    higher_is_better: true,
                }
            })
            .collect()
    }

    /// Analyze and assemble a consistent evaluation report. The status
    /// counts go through the validating factory, so an inconsistent tally is
    /// a hard error rather than a silently wrong report.
    pub fn create_report(&self, metrics: &HashMap<String, f64>) -> Result<EvaluationReport> {
        let metric_values = self.analyze(metrics);
        let status_counts = StatusCounts::from_metrics(&metric_values);
        let overall_status = status_counts.overall();
        EvaluationReport::new(metric_values, status_counts, overall_status)
    }
}

fn classify(value: f64, target: Option<f64>) -> MetricStatus {
    match target {
        None => MetricStatus::Unknown,
        Some(target) => {
            if value >= target {
                MetricStatus::Pass
            } else if value >= target * 0.9 {
                MetricStatus::Warn
            } else {
                MetricStatus::Fail
            }
        }
    }
}

/// Print a KPI summary table to stdout.
pub fn print_summary(report: &EvaluationReport) {
    println!("\n=== KPI Analysis Summary ===");
    println!(
        "{:<12} {:>8} {:>8} {:>7} {:>8}",
        "Metric", "Value", "Target", "Status", "Delta"
    );
    for metric in &report.metrics {
        let (target, delta) = match metric.target {
            Some(t) => (format!("{:.3}", t), format!("{:+.3}", metric.value - t)),
            None => ("N/A".to_string(), String::new()),
        };
        let symbol = match metric.status {
            MetricStatus::Pass => "ok",
            MetricStatus::Warn => "warn",
            MetricStatus::Fail => "FAIL",
            MetricStatus::Unknown => "?",
        };
        println!(
            "{:<12} {:>8.3} {:>8} {:>7} {:>8}",
            metric.name, metric.value, target, symbol, delta
        );
    }
    println!(
        "\nOverall Status: {} ({} pass, {} warn, {} fail, {} unknown)",
        report.overall_status.to_string().to_uppercase(),
        report.status_counts.pass,
        report.status_counts.warn,
        report.status_counts.fail,
        report.status_counts.unknown
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(targets: &[(&str, f64)]) -> KpiAnalyzer {
        KpiAnalyzer::with_targets(
            targets
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(classify(1.0, Some(1.0)), MetricStatus::Pass);
        assert_eq!(classify(0.95, Some(1.0)), MetricStatus::Warn);
        assert_eq!(classify(0.9, Some(1.0)), MetricStatus::Warn);
        assert_eq!(classify(0.85, Some(1.0)), MetricStatus::Fail);
        assert_eq!(classify(0.85, None), MetricStatus::Unknown);
    }

    #[test]
    fn analyze_covers_fixed_metric_list_in_order() {
        let analyzer = analyzer(&[]);
        let values = analyzer.analyze(&HashMap::new());
        assert_eq!(values.len(), 10);
        assert_eq!(values[0].name, "nDCG@10");
        assert_eq!(values[9].name, "HitRate@10");
        assert!(values.iter().all(|m| m.status == MetricStatus::Unknown));
        assert!(values.iter().all(|m| m.value == 0.0));
        assert!(values.iter().all(|m| m.higher_is_better));
    }

    #[test]
    fn analyze_prefers_raw_key_then_prefixed() {
        let analyzer = analyzer(&[]);
        let mut metrics = HashMap::new();
        metrics.insert("ndcg_cut_10".to_string(), 0.42);
        metrics.insert("all.recip_rank".to_string(), 0.7);
        let values = analyzer.analyze(&metrics);
        let ndcg = values.iter().find(|m| m.name == "nDCG@10").unwrap();
        assert!((ndcg.value - 0.42).abs() < 1e-9);
        let mrr = values.iter().find(|m| m.name == "MRR@10").unwrap();
        assert!((mrr.value - 0.7).abs() < 1e-9);
    }

    #[test]
    fn create_report_is_consistent() {
        let analyzer = analyzer(&[("ndcg_cut_10", 0.4), ("recip_rank", 0.9)]);
        let mut metrics = HashMap::new();
        metrics.insert("ndcg_cut_10".to_string(), 0.45); // pass
        metrics.insert("recip_rank".to_string(), 0.5); // fail
        let report = analyzer.create_report(&metrics).unwrap();

        assert_eq!(report.status_counts.pass, 1);
        assert_eq!(report.status_counts.fail, 1);
        assert_eq!(report.status_counts.unknown, 8);
        assert_eq!(report.overall_status, MetricStatus::Fail);
    }

    #[test]
    fn create_report_warn_when_no_fail() {
        let analyzer = analyzer(&[("ndcg_cut_10", 1.0)]);
        let mut metrics = HashMap::new();
        metrics.insert("ndcg_cut_10".to_string(), 0.95);
        let report = analyzer.create_report(&metrics).unwrap();
        assert_eq!(report.overall_status, MetricStatus::Warn);
    }

    #[test]
    fn create_report_all_unknown_without_targets() {
        let analyzer = analyzer(&[]);
        let report = analyzer.create_report(&HashMap::new()).unwrap();
        assert_eq!(report.overall_status, MetricStatus::Unknown);
        assert_eq!(report.status_counts.unknown, 10);
    }
}
