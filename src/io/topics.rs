//! Topic file loading: JSONL, simple TSV, and legacy TREC markup, with
//! format auto-detection.

use crate::error::{RagevalError, Result};
use crate::models::topics::{Topic, TopicFormat, TopicSet};
use log::warn;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct JsonlTopic {
    query_id: String,
    query: String,
    #[serde(default)]
    narrative: Option<String>,
    #[serde(default)]
    question: Option<String>,
}

/// Load topics from JSONL (one JSON object per line, 2025 style).
pub fn load_jsonl_topics(path: &Path) -> Result<TopicSet> {
    let content = read_topic_file(path)?;
    let mut topics = Vec::new();
    let mut skipped = 0usize;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonlTopic>(line) {
            Ok(t) => topics.push(Topic {
                query_id: t.query_id,
                query: t.query,
                narrative: t.narrative,
                question: t.question,
            }),
            Err(e) => {
                skipped += 1;
                warn!("topics {}: skipping bad JSONL line: {}", path.display(), e);
            }
        }
    }
    if skipped > 0 {
        warn!(
            "topics {}: skipped {} malformed lines ({} parsed)",
            path.display(),
            skipped,
            topics.len()
        );
    }

    Ok(TopicSet {
        topics,
        source_file: path.display().to_string(),
        format: TopicFormat::Jsonl,
    })
}

/// Load topics from simple tab-separated format: `query_id\tquery_text`.
pub fn load_simple_topics(path: &Path) -> Result<TopicSet> {
    let content = read_topic_file(path)?;
    let mut topics = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((query_id, query_text)) = line.split_once('\t') {
            topics.push(Topic {
                query_id: query_id.trim().to_string(),
                query: query_text.trim().to_string(),
                narrative: None,
                question: None,
            });
        }
    }

    Ok(TopicSet {
        topics,
        source_file: path.display().to_string(),
        format: TopicFormat::Simple,
    })
}

/// Load topics from legacy TREC markup (`<top>` / `<num>` / `<query>` /
/// `<narr>` blocks, 2024 style).
pub fn load_trec_topics(path: &Path) -> Result<TopicSet> {
    let content = read_topic_file(path)?;
    let mut topics = Vec::new();

    let mut num = String::new();
    let mut query = String::new();
    let mut narrative = String::new();
    let mut in_topic = false;
    let mut in_narrative = false;

    for raw in content.lines() {
        let line = raw.trim();
        if line.starts_with("<top>") {
            in_topic = true;
            num.clear();
            query.clear();
            narrative.clear();
            in_narrative = false;
        } else if line.starts_with("</top>") {
            if in_topic && !num.is_empty() {
                topics.push(Topic {
                    query_id: num.clone(),
                    query: query.clone(),
                    narrative: if narrative.is_empty() {
                        None
                    } else {
                        Some(narrative.trim().to_string())
                    },
                    question: None,
                });
            }
            in_topic = false;
        } else if line.starts_with("<num>") {
            num = strip_tag(line, "num");
        } else if line.starts_with("<query>") {
            query = strip_tag(line, "query");
        } else if line.starts_with("<narr>") {
            in_narrative = true;
            narrative.clear();
        } else if line.starts_with("</narr>") {
            in_narrative = false;
        } else if in_narrative {
            narrative.push(' ');
            narrative.push_str(line);
        }
    }

    Ok(TopicSet {
        topics,
        source_file: path.display().to_string(),
        format: TopicFormat::Trec,
    })
}

fn strip_tag(line: &str, tag: &str) -> String {
    line.replace(&format!("<{}>", tag), "")
        .replace(&format!("</{}>", tag), "")
        .trim()
        .to_string()
}

/// Auto-detect format and load topics: `.jsonl` extension wins, then a
/// tab-separated first line means the simple format, else legacy TREC markup.
pub fn load_topics(path: &Path) -> Result<TopicSet> {
    if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
        return load_jsonl_topics(path);
    }
    let content = read_topic_file(path)?;
    let first_line = content.lines().next().unwrap_or("").trim();
    if first_line.contains('\t') && !first_line.starts_with('<') {
        load_simple_topics(path)
    } else {
        load_trec_topics(path)
    }
}

fn read_topic_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RagevalError::InputMissing(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(name: &str, body: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_jsonl_topics_by_extension() {
        let (_dir, path) = write_file(
            "topics.jsonl",
            r#"{"query_id":"1","query":"first question","question":"What is first?"}
{"query_id":"2","query":"second"}
not json at all
"#,
        );
        let set = load_topics(&path).unwrap();
        assert_eq!(set.format, TopicFormat::Jsonl);
        assert_eq!(set.len(), 2);
        assert_eq!(set.topics[0].question.as_deref(), Some("What is first?"));
    }

    #[test]
    fn detects_simple_tsv_format() {
        let (_dir, path) = write_file("topics.txt", "q1\thow does bm25 work\nq2\twhat is ndcg\n");
        let set = load_topics(&path).unwrap();
        assert_eq!(set.format, TopicFormat::Simple);
        assert_eq!(set.len(), 2);
        assert_eq!(set.topics[1].query, "what is ndcg");
    }

    #[test]
    fn detects_legacy_trec_format() {
        let (_dir, path) = write_file(
            "topics.txt",
            "<top>\n<num>2024-1</num>\n<query>test query</query>\n<narr>\nSome narrative\ntext here\n</narr>\n</top>\n",
        );
        let set = load_topics(&path).unwrap();
        assert_eq!(set.format, TopicFormat::Trec);
        assert_eq!(set.len(), 1);
        assert_eq!(set.topics[0].query_id, "2024-1");
        assert_eq!(set.topics[0].query, "test query");
        assert_eq!(
            set.topics[0].narrative.as_deref(),
            Some("Some narrative text here")
        );
    }

    #[test]
    fn missing_topics_file_reports_path() {
        let err = load_topics(Path::new("/nonexistent/topics.txt")).unwrap_err();
        assert!(matches!(err, RagevalError::InputMissing(_)));
    }
}
