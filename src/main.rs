//! Evaluation CLI: score TREC runs against qrels, compare runs, validate
//! run format, and inspect organizer baselines.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rageval::baselines::BaselineLoader;
use rageval::io::{build_trec_run, load_qrels, load_topics, read_trec_run, write_trec_run};
use rageval::models::{QueryResult, RunMetadata};
use rageval::scoring::{compute_coverage_stats, compute_hitrate_at_k, kpi, KpiAnalyzer, TrecEval};
use rageval::{Config, MetricStatus};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// TREC RAG evaluation harness.
#[derive(Parser, Debug)]
#[command(name = "rageval", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a TREC run against qrels and analyze KPIs.
    Score {
        /// TREC run file.
        run_file: PathBuf,
        /// Qrels file path, or a named entry from [paths.qrels] in config.
        #[arg(long)]
        qrels: String,
        /// Output report file (default: <output_dir>/reports/<run>_report.json).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Build a TREC run file from a retrieval-responses JSON file.
    Build {
        /// JSON file holding an array of query results
        /// (`[{"query_id": ..., "segments": [{"segment_id": ..., "score": ...}]}]`).
        responses: PathBuf,
        /// Run identifier written into every row.
        #[arg(long)]
        run_id: String,
        /// Output run file.
        #[arg(long)]
        output: PathBuf,
    },
    /// Compare two TREC runs metric by metric.
    Compare {
        run1: PathBuf,
        run2: PathBuf,
        #[arg(long)]
        qrels: String,
    },
    /// Validate a run file against TREC format constraints.
    Validate {
        run_file: PathBuf,
    },
    /// Show shape statistics for a configured organizer baseline.
    Baseline {
        /// Baseline name from [paths.baselines] in config.
        name: String,
    },
    /// Inspect a topic file (format auto-detected).
    Topics {
        /// Topic file path, or a named entry from [paths.topics] in config.
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    let config = Config::load()?;

    match args.command {
        Command::Score {
            run_file,
            qrels,
            output,
        } => score(&config, &run_file, &qrels, output).await,
        Command::Build {
            responses,
            run_id,
            output,
        } => build(&responses, &run_id, &output),
        Command::Compare { run1, run2, qrels } => compare(&config, &run1, &run2, &qrels).await,
        Command::Validate { run_file } => validate(&run_file),
        Command::Baseline { name } => baseline(&config, &name),
        Command::Topics { file } => topics(&config, &file),
    }
}

async fn score(
    config: &Config,
    run_file: &Path,
    qrels_arg: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let qrels_path = config.resolve_qrels(qrels_arg);

    let (qrels, qrels_stats) = load_qrels(&qrels_path)?;
    println!("Loaded qrels: {} judgements", qrels.len());
    if qrels_stats.malformed > 0 || qrels_stats.invalid_relevance > 0 {
        println!(
            "Data quality issues: {} malformed lines, {} invalid relevance values skipped",
            qrels_stats.malformed, qrels_stats.invalid_relevance
        );
    }

    let run_id = run_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    let (trec_run, run_stats) = read_trec_run(run_file, run_id)?;
    println!("Loaded run: {} results", trec_run.rows.len());
    if run_stats.skipped > 0 {
        println!("Skipped {} malformed run lines", run_stats.skipped);
    }

    let format_errors = trec_run.validate_format();
    if !format_errors.is_empty() {
        println!("\nFormat validation found {} issues:", format_errors.len());
        for error in &format_errors {
            println!("  - {}", error);
        }
    }

    let evaluator = TrecEval::new(config.trec_eval.clone());
    let mut metrics = evaluator.evaluate(&qrels_path, run_file, None).await?;

    metrics.insert(
        "hitrate_10".to_string(),
        compute_hitrate_at_k(&trec_run, &qrels, 10),
    );
    println!("Computed {} metrics", metrics.len());

    let coverage = compute_coverage_stats(&trec_run, &qrels);
    println!(
        "Coverage: {} queries judged, {} unjudged, {}/{} relevant docs retrieved",
        coverage.queries_with_judgements,
        coverage.queries_without_judgements,
        coverage.retrieved_relevant_docs,
        coverage.total_relevant_docs
    );

    let analyzer = KpiAnalyzer::new(config);
    let report = analyzer.create_report(&metrics)?;
    kpi::print_summary(&report);

    let output = output.unwrap_or_else(|| {
        config.output_path(Path::new(&format!("reports/{}_report.json", run_id)))
    });
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&output, json)
        .with_context(|| format!("failed to write report to {}", output.display()))?;
    println!("\nSaved report to {}", output.display());

    if report.overall_status == MetricStatus::Fail {
        std::process::exit(1);
    }
    Ok(())
}

fn build(responses_path: &Path, run_id: &str, output: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(responses_path)
        .with_context(|| format!("failed to read {}", responses_path.display()))?;
    let responses: Vec<QueryResult> = serde_json::from_str(&json)
        .with_context(|| format!("invalid responses JSON in {}", responses_path.display()))?;

    let metadata = RunMetadata {
        run_id: run_id.to_string(),
        timestamp: chrono::Utc::now(),
        config_snapshot: Default::default(),
        topic_source: responses_path.display().to_string(),
        retrieval_mode: "replay".to_string(),
        top_k: 100,
        num_queries: responses.len(),
    };
    let run = build_trec_run(&responses, run_id, metadata);

    // Invalid runs are not persisted
    let errors = run.validate_format();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  - {}", error);
        }
        anyhow::bail!(
            "run failed format validation with {} errors; refusing to write {}",
            errors.len(),
            output.display()
        );
    }

    write_trec_run(&run, output)?;
    println!(
        "Wrote {} rows for {} queries to {}",
        run.rows.len(),
        run.metadata.num_queries,
        output.display()
    );
    Ok(())
}

async fn compare(
    config: &Config,
    run1: &Path,
    run2: &Path,
    qrels_arg: &str,
) -> anyhow::Result<()> {
    let qrels_path = config.resolve_qrels(qrels_arg);
    let evaluator = TrecEval::new(config.trec_eval.clone());

    let metrics1 = evaluator
        .evaluate(&qrels_path, run1, None)
        .await
        .with_context(|| format!("evaluating {}", run1.display()))?;
    let metrics2 = evaluator
        .evaluate(&qrels_path, run2, None)
        .await
        .with_context(|| format!("evaluating {}", run2.display()))?;

    println!(
        "{:<16} {:>8} {:>8} {:>8} {:>9}",
        "Metric", "Run 1", "Run 2", "Delta", "% Change"
    );
    let names: BTreeSet<&String> = metrics1.keys().collect();
    for name in names {
        let Some(v2) = metrics2.get(name) else {
            continue;
        };
        let v1 = metrics1[name];
        let delta = v2 - v1;
        let pct = if v1 == 0.0 {
            if delta == 0.0 {
                "0.0%".to_string()
            } else if delta > 0.0 {
                "inf".to_string()
            } else {
                "-inf".to_string()
            }
        } else {
            format!("{:+.1}%", delta / v1 * 100.0)
        };
        println!(
            "{:<16} {:>8.3} {:>8.3} {:>+8.3} {:>9}",
            name, v1, v2, delta, pct
        );
    }
    Ok(())
}

fn validate(run_file: &Path) -> anyhow::Result<()> {
    let run_id = run_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    let (trec_run, stats) = read_trec_run(run_file, run_id)?;
    println!(
        "Parsed {} rows ({} skipped) across {} queries",
        stats.parsed, stats.skipped, trec_run.metadata.num_queries
    );

    let errors = trec_run.validate_format();
    if errors.is_empty() {
        println!("Run format is valid");
        Ok(())
    } else {
        println!("Found {} format errors:", errors.len());
        for error in &errors {
            println!("  - {}", error);
        }
        std::process::exit(1);
    }
}

fn topics(config: &Config, file_arg: &str) -> anyhow::Result<()> {
    let path = config.resolve_topics(file_arg);
    let set = load_topics(&path)?;
    println!(
        "Loaded {} topics from {} ({:?} format)",
        set.len(),
        set.source_file,
        set.format
    );
    for topic in &set.topics {
        println!("  {}  {}", topic.query_id, topic.query);
    }
    Ok(())
}

fn baseline(config: &Config, name: &str) -> anyhow::Result<()> {
    let loader = BaselineLoader::new(config);
    let stats = loader.baseline_stats(name)?;
    println!("Baseline '{}':", name);
    println!("  queries:            {}", stats.num_queries);
    println!("  total docs:         {}", stats.total_docs);
    println!("  avg docs per query: {:.1}", stats.avg_docs_per_query);
    Ok(())
}
