//! TREC run building and file I/O.

use crate::error::{RagevalError, Result};
use crate::models::response::QueryResult;
use crate::models::runs::{RunMetadata, TrecRun, TrecRunRow, MAX_RESULTS_PER_QUERY};
use log::warn;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

/// Convert retrieval responses to a TREC run.
///
/// Ranks are assigned by list position (1-based), trusting the caller's
/// ordering; each query contributes at most the first 100 segments. Queries
/// with empty segment lists contribute zero rows. Pure transform.
pub fn build_trec_run(responses: &[QueryResult], run_id: &str, metadata: RunMetadata) -> TrecRun {
    let mut rows = Vec::new();

    for result in responses {
        for (idx, segment) in result
            .segments
            .iter()
            .take(MAX_RESULTS_PER_QUERY)
            .enumerate()
        {
            rows.push(TrecRunRow::new(
                &result.query_id,
                &segment.segment_id,
                (idx + 1) as u32,
                segment.score,
                run_id,
            ));
        }
    }

    TrecRun { rows, metadata }
}

/// Write a TREC run to a 6-column TSV file, creating parent directories as
/// needed. I/O failures propagate with the path attached.
pub fn write_trec_run(run: &TrecRun, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagevalError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to create output directory for {}: {}", output_path.display(), e),
                ))
            })?;
        }
    }

    let file = std::fs::File::create(output_path).map_err(|e| {
        RagevalError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to write run file {}: {}", output_path.display(), e),
        ))
    })?;
    let mut writer = std::io::BufWriter::new(file);
    for row in &run.rows {
        writeln!(writer, "{}", row.to_trec_line())?;
    }
    writer.flush()?;
    Ok(())
}

/// Line statistics from reading a run file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReadStats {
    pub parsed: usize,
    /// Lines without exactly 6 tab-separated fields, or whose rank/score
    /// fields did not parse.
    pub skipped: usize,
}

/// Read a TREC run from a TSV file.
///
/// Malformed lines are skipped and counted, never fatal; the skip count is
/// returned so silent data loss stays observable. Reconstructs minimal
/// metadata: topic_source is the file path, retrieval_mode "unknown", top_k
/// the maximum rank observed (0 if no rows parsed).
pub fn read_trec_run(path: &Path, run_id: &str) -> Result<(TrecRun, RunReadStats)> {
    if !path.exists() {
        return Err(RagevalError::InputMissing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagevalError::Io(std::io::Error::new(
            e.kind(),
            format!("error reading run file {}: {}", path.display(), e),
        ))
    })?;

    let mut rows = Vec::new();
    let mut stats = RunReadStats::default();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 6 {
            stats.skipped += 1;
            continue;
        }
        let (rank, score) = match (parts[3].trim().parse::<u32>(), parts[4].trim().parse::<f64>()) {
            (Ok(rank), Ok(score)) => (rank, score),
            _ => {
                stats.skipped += 1;
                continue;
            }
        };
        rows.push(TrecRunRow {
            query_id: parts[0].to_string(),
            q0: parts[1].to_string(),
            doc_id: parts[2].to_string(),
            rank,
            score,
            run_id: parts[5].to_string(),
        });
        stats.parsed += 1;
    }

    if stats.skipped > 0 {
        warn!(
            "run file {}: skipped {} malformed lines ({} parsed)",
            path.display(),
            stats.skipped,
            stats.parsed
        );
    }

    let top_k = rows.iter().map(|r| r.rank).max().unwrap_or(0);
    let num_queries = rows
        .iter()
        .map(|r| r.query_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let metadata = RunMetadata::minimal(run_id, &path.display().to_string(), top_k, num_queries);

    Ok((TrecRun { rows, metadata }, stats))
}
