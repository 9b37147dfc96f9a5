//! Retrieval-result input shape consumed by the run builder.
//!
//! Produced elsewhere (retrieval backend, mock service, replay files); the
//! harness treats segment lists as opaque ranked output and never inspects
//! how scores were generated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One retrieved segment with its retrieval score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedSegment {
    pub segment_id: String,
    pub score: f64,
    /// Opaque descriptive metadata (title, url, headings). Not used by scoring.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Ranked result list for a single query, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_id: String,
    pub segments: Vec<RetrievedSegment>,
}

impl QueryResult {
    pub fn new(query_id: &str, segments: Vec<RetrievedSegment>) -> Self {
        Self {
            query_id: query_id.to_string(),
            segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_without_metadata() {
        let json = r#"{"query_id":"q1","segments":[{"segment_id":"d1","score":0.9}]}"#;
        let result: QueryResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.query_id, "q1");
        assert_eq!(result.segments[0].segment_id, "d1");
        assert!(result.segments[0].metadata.is_empty());
    }
}
