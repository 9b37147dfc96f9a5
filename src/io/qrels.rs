//! Qrels (relevance judgment) loading and lookups.

use crate::error::{RagevalError, Result};
use log::warn;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Single relevance judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrelEntry {
    pub query_id: String,
    pub doc_id: String,
    pub relevance: u32,
}

/// Collection of relevance judgments.
///
/// Duplicate (query_id, doc_id) pairs are tolerated: all entries are kept,
/// and [`Qrels::relevance_grades`] resolves duplicates last-wins.
#[derive(Debug, Clone, Default)]
pub struct Qrels {
    pub entries: Vec<QrelEntry>,
}

impl Qrels {
    pub fn new(entries: Vec<QrelEntry>) -> Self {
        Self { entries }
    }

    /// Documents judged relevant (relevance > 0) for a query.
    pub fn relevant_docs(&self, query_id: &str) -> HashSet<&str> {
        self.entries
            .iter()
            .filter(|e| e.query_id == query_id && e.relevance > 0)
            .map(|e| e.doc_id.as_str())
            .collect()
    }

    /// Relevance grade per document for a query. Last entry wins on
    /// duplicate (query_id, doc_id) pairs.
    pub fn relevance_grades(&self, query_id: &str) -> HashMap<&str, u32> {
        self.entries
            .iter()
            .filter(|e| e.query_id == query_id)
            .map(|e| (e.doc_id.as_str(), e.relevance))
            .collect()
    }

    /// All query ids with at least one judgment.
    pub fn query_ids(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.query_id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Parse statistics surfaced to the caller so skipped lines are observable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QrelsStats {
    pub parsed: usize,
    /// Lines with fewer than 3 whitespace-separated fields.
    pub malformed: usize,
    /// Lines whose relevance field did not parse as a non-negative integer.
    pub invalid_relevance: usize,
}

/// Load a TREC qrels file: `query_id unused doc_id [relevance]` per line,
/// whitespace separated. Relevance defaults to 1 when the 4th field is
/// absent. Unparsable lines are skipped and counted, never fatal.
pub fn load_qrels(path: &Path) -> Result<(Qrels, QrelsStats)> {
    if !path.exists() {
        return Err(RagevalError::InputMissing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;

    let mut entries = Vec::new();
    let mut stats = QrelsStats::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 3 {
            stats.malformed += 1;
            continue;
        }
        let relevance = match parts.get(3) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(rel) => rel,
                Err(_) => {
                    stats.invalid_relevance += 1;
                    continue;
                }
            },
            None => 1,
        };
        entries.push(QrelEntry {
            query_id: parts[0].to_string(),
            doc_id: parts[2].to_string(),
            relevance,
        });
        stats.parsed += 1;
    }

    if stats.malformed > 0 || stats.invalid_relevance > 0 {
        warn!(
            "qrels {}: skipped {} malformed lines and {} invalid relevance values ({} parsed)",
            path.display(),
            stats.malformed,
            stats.invalid_relevance,
            stats.parsed
        );
    }

    Ok((Qrels::new(entries), stats))
}
