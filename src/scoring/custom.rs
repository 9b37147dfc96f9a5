//! Custom metrics not provided by trec_eval: HitRate@k and coverage stats.

use crate::io::qrels::Qrels;
use crate::models::runs::{TrecRun, TrecRunRow};
use std::collections::{BTreeMap, HashSet};

fn group_by_query(run: &TrecRun) -> BTreeMap<&str, Vec<&TrecRunRow>> {
    let mut by_query: BTreeMap<&str, Vec<&TrecRunRow>> = BTreeMap::new();
    for row in &run.rows {
        by_query.entry(row.query_id.as_str()).or_default().push(row);
    }
    by_query
}

/// HitRate@k: fraction of eligible queries whose top-k contains at least one
/// judged-relevant document.
///
/// Queries with zero judged-relevant documents are excluded from both the
/// numerator and the denominator: a query cannot be hit or missed without
/// ground truth. Returns 0.0 for an empty run or zero eligible queries.
pub fn compute_hitrate_at_k(run: &TrecRun, qrels: &Qrels, k: usize) -> f64 {
    if run.rows.is_empty() {
        return 0.0;
    }

    let mut hits = 0usize;
    let mut eligible = 0usize;

    for (query_id, rows) in group_by_query(run) {
        let relevant = qrels.relevant_docs(query_id);
        if relevant.is_empty() {
            continue;
        }
        eligible += 1;

        let mut ordered = rows;
        ordered.sort_by_key(|r| r.rank);
        let top_k: HashSet<&str> = ordered.iter().take(k).map(|r| r.doc_id.as_str()).collect();
        if top_k.iter().any(|doc| relevant.contains(doc)) {
            hits += 1;
        }
    }

    if eligible == 0 {
        0.0
    } else {
        hits as f64 / eligible as f64
    }
}

/// Coverage statistics for a run against a qrels table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageStats {
    pub queries_with_judgements: usize,
    pub queries_without_judgements: usize,
    pub total_relevant_docs: usize,
    /// Relevant docs present anywhere in the query's retrieved set
    /// (set intersection, not rank-weighted).
    pub retrieved_relevant_docs: usize,
}

/// Classify every distinct query in the run by whether it has judged-relevant
/// documents, and count how many of those were actually retrieved.
pub fn compute_coverage_stats(run: &TrecRun, qrels: &Qrels) -> CoverageStats {
    let mut stats = CoverageStats::default();

    for (query_id, rows) in group_by_query(run) {
        let relevant = qrels.relevant_docs(query_id);
        if relevant.is_empty() {
            stats.queries_without_judgements += 1;
            continue;
        }
        stats.queries_with_judgements += 1;
        stats.total_relevant_docs += relevant.len();

        let retrieved: HashSet<&str> = rows.iter().map(|r| r.doc_id.as_str()).collect();
        stats.retrieved_relevant_docs += retrieved.intersection(&relevant).count();
    }

    stats
}
