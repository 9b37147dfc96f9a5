//! Organizer baseline run loading and summary statistics.

use crate::config::Config;
use crate::error::{RagevalError, Result};
use crate::io::runs::read_trec_run;
use crate::models::runs::TrecRun;
use std::collections::HashMap;

/// Load organizer baseline runs named in config for comparison.
pub struct BaselineLoader<'a> {
    config: &'a Config,
}

/// Shape of a baseline run file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineStats {
    pub num_queries: usize,
    pub avg_docs_per_query: f64,
    pub total_docs: usize,
}

impl<'a> BaselineLoader<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Load a named baseline run; run_id is derived from the file stem.
    pub fn load_baseline(&self, name: &str) -> Result<TrecRun> {
        let rel = self.config.paths.baselines.get(name).ok_or_else(|| {
            let available: Vec<&str> = self
                .config
                .paths
                .baselines
                .keys()
                .map(String::as_str)
                .collect();
            RagevalError::Config(format!(
                "unknown baseline '{}'; available: {:?}",
                name, available
            ))
        })?;
        let path = self.config.data_path(rel);

        let run_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("baseline")
            .to_string();

        let (run, _stats) = read_trec_run(&path, &run_id)?;
        Ok(run)
    }

    /// Baseline shape statistics for a quick sanity check before comparing.
    pub fn baseline_stats(&self, name: &str) -> Result<BaselineStats> {
        let baseline = self.load_baseline(name)?;

        let mut per_query: HashMap<&str, usize> = HashMap::new();
        for row in &baseline.rows {
            *per_query.entry(row.query_id.as_str()).or_default() += 1;
        }

        let num_queries = per_query.len();
        let total_docs = baseline.rows.len();
        let avg_docs_per_query = if num_queries == 0 {
            0.0
        } else {
            total_docs as f64 / num_queries as f64
        };

        Ok(BaselineStats {
            num_queries,
            avg_docs_per_query,
            total_docs,
        })
    }
}
