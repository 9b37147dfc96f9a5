//! Wrapper for the external trec_eval binary, with in-process fallback when
//! the binary is not installed.

use crate::config::TrecEvalConfig;
use crate::error::{RagevalError, Result};
use crate::io::qrels::load_qrels;
use crate::io::runs::read_trec_run;
use crate::scoring::fallback::evaluate_fallback;
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// External evaluator wrapper.
///
/// Invokes `<binary> <flags> [-m <metric>]... <qrels> <run>` with a
/// wall-clock timeout and parses the tabular stdout, keeping only the
/// system-wide ("all") rows. Falls back to [`evaluate_fallback`] only when
/// the binary itself is missing; every other failure is fatal to the call.
pub struct TrecEval {
    config: TrecEvalConfig,
}

impl TrecEval {
    pub fn new(config: TrecEvalConfig) -> Self {
        Self { config }
    }

    /// Run trec_eval and return `metric name -> system-wide value`.
    ///
    /// `metrics` overrides the configured metric list when given. Fails fast
    /// if either input file is missing, before any process is spawned.
    pub async fn evaluate(
        &self,
        qrels_path: &Path,
        run_path: &Path,
        metrics: Option<&[String]>,
    ) -> Result<HashMap<String, f64>> {
        if !qrels_path.exists() {
            return Err(RagevalError::InputMissing(qrels_path.to_path_buf()));
        }
        if !run_path.exists() {
            return Err(RagevalError::InputMissing(run_path.to_path_buf()));
        }

        let metrics: Vec<String> = metrics
            .map(|m| m.to_vec())
            .unwrap_or_else(|| self.config.metrics.clone());

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.args(&self.config.flags);
        for metric in &metrics {
            cmd.arg("-m").arg(metric);
        }
        cmd.arg(qrels_path).arg(run_path);
        cmd.kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => {
                return Err(RagevalError::Evaluator(format!(
                    "{} timed out after {}s on {} / {}; this signals an environmental \
                     problem (hung process, huge input), not something a retry would fix",
                    self.config.binary_path.display(),
                    self.config.timeout_secs,
                    qrels_path.display(),
                    run_path.display()
                )));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                // Developer environments often lack the binary; compute the
                // same metrics in-process. All other spawn failures are fatal.
                info!(
                    "trec_eval binary not found at {}, falling back to in-process \
                     evaluation of {:?}",
                    self.config.binary_path.display(),
                    metrics
                );
                return self.fallback(qrels_path, run_path, &metrics);
            }
            Ok(Err(e)) => {
                return Err(RagevalError::Evaluator(format!(
                    "failed to run {}: {}",
                    self.config.binary_path.display(),
                    e
                )));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RagevalError::Evaluator(format!(
                "{} exited with {}: {}",
                self.config.binary_path.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_trec_eval_output(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    fn fallback(
        &self,
        qrels_path: &Path,
        run_path: &Path,
        metrics: &[String],
    ) -> Result<HashMap<String, f64>> {
        let (qrels, qrels_stats) = load_qrels(qrels_path)?;
        let (run, run_stats) = read_trec_run(run_path, "fallback")?;
        if qrels_stats.malformed > 0 || run_stats.skipped > 0 {
            warn!(
                "fallback inputs had skipped lines (qrels: {}, run: {})",
                qrels_stats.malformed, run_stats.skipped
            );
        }
        Ok(evaluate_fallback(&qrels, &run, metrics))
    }
}

/// Parse trec_eval stdout: lines of `<metric> <query_id|all> <value>`,
/// keeping only the system-wide "all" rows. Malformed numeric fields are
/// logged and skipped, not fatal.
pub fn parse_trec_eval_output(output: &str) -> HashMap<String, f64> {
    let mut metrics = HashMap::new();

    for (line_num, line) in output.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let (name, scope, raw_value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(s), Some(v)) => (n, s, v),
            _ => continue,
        };
        if scope != "all" {
            continue;
        }
        match raw_value.parse::<f64>() {
            Ok(value) => {
                metrics.insert(name.to_string(), value);
            }
            Err(e) => {
                warn!(
                    "malformed numeric value in trec_eval output line {}: metric={}, raw='{}', {}",
                    line_num + 1,
                    name,
                    raw_value,
                    e
                );
            }
        }
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrecEvalConfig;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn parses_all_rows_only() {
        let output = "ndcg_cut_10 \tall\t0.3456\n\
                      ndcg_cut_10 \t2024-145979\t0.4613\n\
                      recip_rank \tall\t0.7012\n";
        let metrics = parse_trec_eval_output(output);
        assert_eq!(metrics.len(), 2);
        assert!((metrics["ndcg_cut_10"] - 0.3456).abs() < 1e-9);
        assert!((metrics["recip_rank"] - 0.7012).abs() < 1e-9);
    }

    #[test]
    fn skips_malformed_values_and_short_lines() {
        let output = "ndcg_cut_10 all notanumber\n\
                      incomplete\n\
                      \n\
                      map all 0.25\n";
        let metrics = parse_trec_eval_output(output);
        assert_eq!(metrics.len(), 1);
        assert!((metrics["map"] - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_qrels_fails_before_spawn() {
        let dir = TempDir::new().unwrap();
        let run_path = dir.path().join("run.tsv");
        std::fs::write(&run_path, "q1\tQ0\td1\t1\t0.900000\tr\n").unwrap();

        let eval = TrecEval::new(TrecEvalConfig::default());
        let err = eval
            .evaluate(&dir.path().join("missing.qrels"), &run_path, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagevalError::InputMissing(_)));
        assert!(err.to_string().contains("missing.qrels"));
    }

    #[tokio::test]
    async fn missing_binary_falls_back_to_in_process() {
        let dir = TempDir::new().unwrap();
        let qrels_path = dir.path().join("qrels.txt");
        std::fs::write(&qrels_path, "q1 0 d1 1\n").unwrap();
        let run_path = dir.path().join("run.tsv");
        std::fs::write(&run_path, "q1\tQ0\td1\t1\t0.900000\tr\n").unwrap();

        let config = TrecEvalConfig {
            binary_path: PathBuf::from("/definitely/not/a/real/trec_eval_binary"),
            ..TrecEvalConfig::default()
        };
        let eval = TrecEval::new(config);
        let metrics = eval
            .evaluate(&qrels_path, &run_path, Some(&["recip_rank".to_string()]))
            .await
            .unwrap();
        assert!((metrics["recip_rank"] - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let qrels_path = dir.path().join("qrels.txt");
        std::fs::write(&qrels_path, "q1 0 d1 1\n").unwrap();
        let run_path = dir.path().join("run.tsv");
        std::fs::write(&run_path, "q1\tQ0\td1\t1\t0.900000\tr\n").unwrap();

        // `sh -c` exists everywhere the test suite runs; flags make it fail
        let config = TrecEvalConfig {
            binary_path: PathBuf::from("sh"),
            flags: vec![
                "-c".to_string(),
                "echo boom >&2; exit 2".to_string(),
            ],
            metrics: vec![],
            timeout_secs: 30,
        };
        let eval = TrecEval::new(config);
        let err = eval.evaluate(&qrels_path, &run_path, None).await.unwrap_err();
        match err {
            RagevalError::Evaluator(msg) => assert!(msg.contains("boom")),
            other => panic!("expected Evaluator error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn timeout_is_reported_not_retried() {
        let dir = TempDir::new().unwrap();
        let qrels_path = dir.path().join("qrels.txt");
        std::fs::write(&qrels_path, "q1 0 d1 1\n").unwrap();
        let run_path = dir.path().join("run.tsv");
        std::fs::write(&run_path, "q1\tQ0\td1\t1\t0.900000\tr\n").unwrap();

        // Appended qrels/run paths land in the script's positional params
        let config = TrecEvalConfig {
            binary_path: PathBuf::from("sh"),
            flags: vec!["-c".to_string(), "sleep 5".to_string()],
            metrics: vec![],
            timeout_secs: 1,
        };
        let eval = TrecEval::new(config);
        let err = eval.evaluate(&qrels_path, &run_path, None).await.unwrap_err();
        match err {
            RagevalError::Evaluator(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected Evaluator error, got {:?}", other),
        }
    }
}
