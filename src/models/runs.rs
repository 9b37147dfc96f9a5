//! TREC run models and format validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum results per query allowed by the TREC run format.
pub const MAX_RESULTS_PER_QUERY: usize = 100;

/// Tolerance when comparing adjacent scores for monotonicity. Scores written
/// with 6-digit precision accumulate floating noise well below this.
const SCORE_EPSILON: f64 = 1e-9;

/// Single line in a TREC run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrecRunRow {
    pub query_id: String,
    /// Literal "Q0" required by the TREC format.
    pub q0: String,
    pub doc_id: String,
    pub rank: u32,
    pub score: f64,
    pub run_id: String,
}

impl TrecRunRow {
    pub fn new(query_id: &str, doc_id: &str, rank: u32, score: f64, run_id: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            q0: "Q0".to_string(),
            doc_id: doc_id.to_string(),
            rank,
            score,
            run_id: run_id.to_string(),
        }
    }

    /// Format as TREC 6-column TSV (score with 6 decimal digits).
    pub fn to_trec_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{:.6}\t{}",
            self.query_id, self.q0, self.doc_id, self.rank, self.score, self.run_id
        )
    }
}

/// Metadata for reproducibility. Descriptive only; never consulted by scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub config_snapshot: BTreeMap<String, String>,
    pub topic_source: String,
    pub retrieval_mode: String,
    pub top_k: u32,
    pub num_queries: usize,
}

impl RunMetadata {
    /// Minimal metadata for a run reconstructed from a file on disk.
    pub fn minimal(run_id: &str, topic_source: &str, top_k: u32, num_queries: usize) -> Self {
        Self {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            config_snapshot: BTreeMap::new(),
            topic_source: topic_source.to_string(),
            retrieval_mode: "unknown".to_string(),
            top_k,
            num_queries,
        }
    }
}

/// Complete TREC run with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrecRun {
    pub rows: Vec<TrecRunRow>,
    pub metadata: RunMetadata,
}

impl TrecRun {
    /// Validate TREC format constraints, returning one message per finding.
    ///
    /// Never fails; an empty list means the run is valid. The caller decides
    /// whether findings are fatal (typically: refuse to persist the run).
    /// Checks, per query: at most 100 rows, row-level field sanity, unique
    /// ranks, dense 1..N rank coverage, and non-increasing scores in rank
    /// order (within a small tolerance for floating noise).
    pub fn validate_format(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Row-level field checks first, in input order
        for row in &self.rows {
            if row.query_id.is_empty() {
                errors.push(format!("Row for doc {} has empty query_id", row.doc_id));
            }
            if row.doc_id.is_empty() {
                errors.push(format!("Query {} has a row with empty doc_id", row.query_id));
            }
            if row.rank == 0 {
                errors.push(format!(
                    "Query {} has invalid rank 0 for doc {} (ranks are 1-based)",
                    row.query_id, row.doc_id
                ));
            }
            if !row.score.is_finite() {
                errors.push(format!(
                    "Query {} has non-finite score {} at rank {}",
                    row.query_id, row.score, row.rank
                ));
            }
        }

        // Group rows per query; BTreeMap keeps error output deterministic
        let mut by_query: BTreeMap<&str, Vec<&TrecRunRow>> = BTreeMap::new();
        for row in &self.rows {
            by_query.entry(row.query_id.as_str()).or_default().push(row);
        }

        for (qid, rows) in &by_query {
            // Cardinality
            if rows.len() > MAX_RESULTS_PER_QUERY {
                errors.push(format!(
                    "Query {} has {} results (max {})",
                    qid,
                    rows.len(),
                    MAX_RESULTS_PER_QUERY
                ));
            }

            // Rank uniqueness and dense 1..N coverage
            let mut seen = std::collections::HashSet::new();
            for row in rows {
                if !seen.insert(row.rank) {
                    errors.push(format!("Query {} has duplicate rank {}", qid, row.rank));
                }
            }
            let expected_max = rows.len() as u32;
            let missing: Vec<u32> = (1..=expected_max).filter(|r| !seen.contains(r)).collect();
            if !missing.is_empty() {
                let rendered: Vec<String> = missing.iter().map(|r| r.to_string()).collect();
                errors.push(format!(
                    "Query {} is missing ranks {} (expected dense 1..{})",
                    qid,
                    rendered.join(", "),
                    expected_max
                ));
            }

            // Score monotonicity in ascending rank order
            let mut ordered: Vec<&&TrecRunRow> = rows.iter().collect();
            ordered.sort_by_key(|r| r.rank);
            for pair in ordered.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                if next.score > prev.score + SCORE_EPSILON {
                    errors.push(format!(
                        "Query {} has increasing scores at ranks {}, {} ({:.6} -> {:.6})",
                        qid, prev.rank, next.rank, prev.score, next.score
                    ));
                }
            }
        }

        errors
    }

    /// Distinct query ids in row order of first appearance.
    pub fn query_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if seen.insert(row.query_id.as_str()) {
                out.push(row.query_id.as_str());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with_rows(rows: Vec<TrecRunRow>) -> TrecRun {
        let num_queries = rows
            .iter()
            .map(|r| r.query_id.clone())
            .collect::<std::collections::HashSet<_>>()
            .len();
        TrecRun {
            rows,
            metadata: RunMetadata::minimal("test-run", "test", 100, num_queries),
        }
    }

    #[test]
    fn trec_line_formats_score_with_six_decimals() {
        let row = TrecRunRow::new("q1", "doc-5", 1, 0.5, "my-run");
        assert_eq!(row.to_trec_line(), "q1\tQ0\tdoc-5\t1\t0.500000\tmy-run");
    }

    #[test]
    fn valid_run_has_no_errors() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q1", "d1", 1, 0.9, "r"),
            TrecRunRow::new("q1", "d2", 2, 0.5, "r"),
            TrecRunRow::new("q2", "d3", 1, 0.7, "r"),
        ]);
        assert!(run.validate_format().is_empty());
    }

    #[test]
    fn equal_scores_are_valid_ties() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q1", "d1", 1, 0.5, "r"),
            TrecRunRow::new("q1", "d2", 2, 0.5, "r"),
        ]);
        assert!(run.validate_format().is_empty());
    }

    #[test]
    fn detects_increasing_scores() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q1", "d1", 1, 0.8, "r"),
            TrecRunRow::new("q1", "d2", 2, 0.9, "r"),
        ]);
        let errors = run.validate_format();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("q1"));
        assert!(errors[0].contains("ranks 1, 2"));
    }

    #[test]
    fn detects_duplicate_rank() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q1", "d1", 1, 0.9, "r"),
            TrecRunRow::new("q1", "d2", 1, 0.8, "r"),
        ]);
        let errors = run.validate_format();
        assert!(errors.iter().any(|e| e.contains("duplicate rank 1")));
        // Two rows, ranks {1}: rank 2 is also reported missing
        assert!(errors.iter().any(|e| e.contains("missing ranks 2")));
    }

    #[test]
    fn detects_missing_rank_gap() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q1", "d1", 1, 0.9, "r"),
            TrecRunRow::new("q1", "d2", 3, 0.8, "r"),
        ]);
        let errors = run.validate_format();
        assert!(errors.iter().any(|e| e.contains("missing ranks 2")));
    }

    #[test]
    fn detects_over_100_rows() {
        let rows: Vec<TrecRunRow> = (1..=101)
            .map(|i| TrecRunRow::new("q1", &format!("d{}", i), i, 1.0 - i as f64 * 0.001, "r"))
            .collect();
        let run = run_with_rows(rows);
        let errors = run.validate_format();
        assert!(errors.iter().any(|e| e.contains("101 results (max 100)")));
    }

    #[test]
    fn detects_non_finite_score_and_zero_rank() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q1", "d1", 0, f64::NAN, "r"),
        ]);
        let errors = run.validate_format();
        assert!(errors.iter().any(|e| e.contains("invalid rank 0")));
        assert!(errors.iter().any(|e| e.contains("non-finite score")));
    }

    #[test]
    fn validation_is_idempotent() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q1", "d1", 1, 0.2, "r"),
            TrecRunRow::new("q1", "d2", 2, 0.9, "r"),
            TrecRunRow::new("q2", "d3", 1, 0.9, "r"),
            TrecRunRow::new("q2", "d4", 1, 0.8, "r"),
        ]);
        assert_eq!(run.validate_format(), run.validate_format());
    }

    #[test]
    fn query_ids_preserve_first_appearance_order() {
        let run = run_with_rows(vec![
            TrecRunRow::new("q2", "d1", 1, 0.9, "r"),
            TrecRunRow::new("q1", "d2", 1, 0.9, "r"),
            TrecRunRow::new("q2", "d3", 2, 0.8, "r"),
        ]);
        assert_eq!(run.query_ids(), vec!["q2", "q1"]);
    }
}
