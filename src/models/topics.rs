//! Topic models for TREC evaluation.

use serde::{Deserialize, Serialize};

/// Single TREC topic/query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub query_id: String,
    pub query: String,
    /// Detailed information need (legacy TREC narrative).
    #[serde(default)]
    pub narrative: Option<String>,
    /// Natural language question (2025-style JSONL topics).
    #[serde(default)]
    pub question: Option<String>,
}

impl Topic {
    /// Query length in words.
    pub fn query_length(&self) -> usize {
        self.query.split_whitespace().count()
    }
}

/// Source format a topic file was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicFormat {
    Jsonl,
    Simple,
    Trec,
}

/// Collection of topics with source metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSet {
    pub topics: Vec<Topic>,
    pub source_file: String,
    pub format: TopicFormat,
}

impl TopicSet {
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn get_by_id(&self, query_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.query_id == query_id)
    }

    pub fn query_ids(&self) -> Vec<&str> {
        self.topics.iter().map(|t| t.query_id.as_str()).collect()
    }
}
