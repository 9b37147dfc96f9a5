//! In-process metric computation, used when the trec_eval binary is absent.
//!
//! Mirrors trec_eval semantics: each query's rows are re-sorted by
//! descending score (doc id descending on ties, the trec_eval convention)
//! before computing per-query values, and every metric is aggregated as the
//! arithmetic mean over queries that have at least one judgment.

use crate::io::qrels::Qrels;
use crate::models::runs::{TrecRun, TrecRunRow};
use log::warn;
use std::collections::{BTreeSet, HashMap};

/// Cutoffs used when a metric family is requested without an explicit
/// cutoff (e.g. "ndcg_cut" expands to ndcg_cut_10 .. ndcg_cut_100).
const DEFAULT_CUTOFFS: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    NdcgCut(usize),
    MapCut(usize),
    Map,
    RecipRank,
    Recall(usize),
    Precision(usize),
}

impl Metric {
    fn name(&self) -> String {
        match self {
            Metric::NdcgCut(k) => format!("ndcg_cut_{}", k),
            Metric::MapCut(k) => format!("map_cut_{}", k),
            Metric::Map => "map".to_string(),
            Metric::RecipRank => "recip_rank".to_string(),
            Metric::Recall(k) => format!("recall_{}", k),
            Metric::Precision(k) => format!("P_{}", k),
        }
    }
}

/// Expand a requested metric name into concrete metrics. A bare family name
/// gets the default cutoffs; unknown names yield nothing (callers record a
/// NaN sentinel for them).
fn parse_metric(name: &str) -> Vec<Metric> {
    fn with_cutoff(name: &str, prefix: &str) -> Option<usize> {
        name.strip_prefix(prefix)?.parse().ok()
    }

    match name {
        "ndcg_cut" => DEFAULT_CUTOFFS.iter().map(|&k| Metric::NdcgCut(k)).collect(),
        "map_cut" => DEFAULT_CUTOFFS.iter().map(|&k| Metric::MapCut(k)).collect(),
        "recall" => DEFAULT_CUTOFFS.iter().map(|&k| Metric::Recall(k)).collect(),
        "P" => DEFAULT_CUTOFFS.iter().map(|&k| Metric::Precision(k)).collect(),
        "map" => vec![Metric::Map],
        "recip_rank" => vec![Metric::RecipRank],
        _ => {
            if let Some(k) = with_cutoff(name, "ndcg_cut_") {
                vec![Metric::NdcgCut(k)]
            } else if let Some(k) = with_cutoff(name, "map_cut_") {
                vec![Metric::MapCut(k)]
            } else if let Some(k) = with_cutoff(name, "recall_") {
                vec![Metric::Recall(k)]
            } else if let Some(k) = with_cutoff(name, "P_") {
                vec![Metric::Precision(k)]
            } else {
                vec![]
            }
        }
    }
}

/// Compute system-wide metric values in-process.
///
/// Per-query values are averaged over every query with at least one
/// judgment (queries absent from the run contribute zeros, matching
/// trec_eval's `-c` flag). Non-finite per-query values are excluded with a
/// warning; a metric left with zero valid values is recorded as NaN so the
/// caller sees it failed to compute rather than mistaking absence for
/// exclusion.
pub fn evaluate_fallback(
    qrels: &Qrels,
    run: &TrecRun,
    metric_names: &[String],
) -> HashMap<String, f64> {
    let mut metrics: Vec<Metric> = Vec::new();
    let mut results: HashMap<String, f64> = HashMap::new();

    for name in metric_names {
        let parsed = parse_metric(name);
        if parsed.is_empty() {
            warn!("fallback evaluator does not support metric '{}'", name);
            results.insert(name.clone(), f64::NAN);
        }
        for metric in parsed {
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
    }

    // Rows per query, re-sorted by score the way trec_eval ranks them.
    let mut by_query: HashMap<&str, Vec<&TrecRunRow>> = HashMap::new();
    for row in &run.rows {
        by_query.entry(row.query_id.as_str()).or_default().push(row);
    }
    for rows in by_query.values_mut() {
        rows.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.doc_id.cmp(&a.doc_id))
        });
    }

    // BTreeSet keeps query iteration deterministic.
    let query_ids: BTreeSet<&str> = qrels.query_ids().into_iter().collect();
    let empty: Vec<&TrecRunRow> = Vec::new();

    let mut valid_per_metric: Vec<Vec<f64>> = vec![Vec::new(); metrics.len()];
    for qid in &query_ids {
        let rows = by_query.get(qid).unwrap_or(&empty);
        let grades = qrels.relevance_grades(qid);
        for (metric, valid) in metrics.iter().zip(valid_per_metric.iter_mut()) {
            let value = per_query_value(*metric, rows, &grades);
            if value.is_finite() {
                valid.push(value);
            } else {
                warn!(
                    "fallback: non-finite {} value for query {} excluded from mean",
                    metric.name(),
                    qid
                );
            }
        }
    }

    for (metric, valid) in metrics.iter().zip(valid_per_metric.iter()) {
        let aggregate = if valid.is_empty() {
            warn!("fallback: no valid per-query values for {}", metric.name());
            f64::NAN
        } else {
            valid.iter().sum::<f64>() / valid.len() as f64
        };
        results.insert(metric.name(), aggregate);
    }

    results
}

fn per_query_value(metric: Metric, rows: &[&TrecRunRow], grades: &HashMap<&str, u32>) -> f64 {
    match metric {
        Metric::NdcgCut(k) => ndcg_at(rows, grades, k),
        Metric::MapCut(k) => average_precision(rows, grades, k),
        Metric::Map => average_precision(rows, grades, rows.len().max(1)),
        Metric::RecipRank => reciprocal_rank(rows, grades),
        Metric::Recall(k) => recall_at(rows, grades, k),
        Metric::Precision(k) => precision_at(rows, grades, k),
    }
}

fn grade_of(row: &TrecRunRow, grades: &HashMap<&str, u32>) -> u32 {
    grades.get(row.doc_id.as_str()).copied().unwrap_or(0)
}

fn num_relevant(grades: &HashMap<&str, u32>) -> usize {
    grades.values().filter(|&&g| g > 0).count()
}

/// nDCG@k with linear gains: DCG = sum rel_i / log2(i + 1), i 1-based
/// (the trec_eval ndcg_cut formulation).
fn ndcg_at(rows: &[&TrecRunRow], grades: &HashMap<&str, u32>, k: usize) -> f64 {
    let dcg: f64 = rows
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, row)| grade_of(row, grades) as f64 / ((i + 2) as f64).log2())
        .sum();

    let mut ideal: Vec<u32> = grades.values().copied().filter(|&g| g > 0).collect();
    ideal.sort_unstable_by(|a, b| b.cmp(a));
    let idcg: f64 = ideal
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, &g)| g as f64 / ((i + 2) as f64).log2())
        .sum();

    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// Average precision at cutoff k, divided by the total relevant count.
fn average_precision(rows: &[&TrecRunRow], grades: &HashMap<&str, u32>, k: usize) -> f64 {
    let total_relevant = num_relevant(grades);
    if total_relevant == 0 {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, row) in rows.iter().take(k).enumerate() {
        if grade_of(row, grades) > 0 {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / total_relevant as f64
}

fn reciprocal_rank(rows: &[&TrecRunRow], grades: &HashMap<&str, u32>) -> f64 {
    for (i, row) in rows.iter().enumerate() {
        if grade_of(row, grades) > 0 {
            return 1.0 / (i + 1) as f64;
        }
    }
    0.0
}

fn recall_at(rows: &[&TrecRunRow], grades: &HashMap<&str, u32>, k: usize) -> f64 {
    let total_relevant = num_relevant(grades);
    if total_relevant == 0 {
        return 0.0;
    }
    let retrieved = rows
        .iter()
        .take(k)
        .filter(|row| grade_of(row, grades) > 0)
        .count();
    retrieved as f64 / total_relevant as f64
}

fn precision_at(rows: &[&TrecRunRow], grades: &HashMap<&str, u32>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let retrieved = rows
        .iter()
        .take(k)
        .filter(|row| grade_of(row, grades) > 0)
        .count();
    retrieved as f64 / k as f64
}
