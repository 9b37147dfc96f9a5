use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub trec_eval: TrecEvalConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// External trec_eval binary configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrecEvalConfig {
    /// Binary name or path; resolved through PATH when not absolute.
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,
    #[serde(default = "default_flags")]
    pub flags: Vec<String>,
    /// Metrics passed as repeated `-m` arguments.
    #[serde(default = "default_metric_names")]
    pub metrics: Vec<String>,
    /// Wall-clock bound on the subprocess; a hung evaluator is an
    /// environmental problem, not something to retry.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TrecEvalConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            flags: default_flags(),
            metrics: default_metric_names(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Metric targets configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_primary_metric")]
    pub primary: String,
    /// KPI targets keyed by raw trec_eval metric name (e.g. "ndcg_cut_10").
    #[serde(default)]
    pub targets: BTreeMap<String, f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_metric(),
            targets: BTreeMap::new(),
        }
    }
}

/// Path configuration: data root plus named qrels/topics/baseline files
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Named topic files, relative to data_dir (e.g. "rag24" -> "topics.rag24.txt").
    #[serde(default)]
    pub topics: BTreeMap<String, PathBuf>,
    /// Named qrels files, relative to data_dir.
    #[serde(default)]
    pub qrels: BTreeMap<String, PathBuf>,
    /// Named organizer baseline run files, relative to data_dir.
    #[serde(default)]
    pub baselines: BTreeMap<String, PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            topics: BTreeMap::new(),
            qrels: BTreeMap::new(),
            baselines: BTreeMap::new(),
        }
    }
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("trec_eval")
}

fn default_flags() -> Vec<String> {
    vec!["-c".to_string()]
}

fn default_metric_names() -> Vec<String> {
    vec![
        "ndcg_cut".to_string(),
        "map_cut".to_string(),
        "recip_rank".to_string(),
        "recall".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_primary_metric() -> String {
    "ndcg_cut_10".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".data/trec_rag_assets")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RAGEVAL_CONFIG environment variable
    /// 2. ./rageval.toml in current directory (all defaults if absent)
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RAGEVAL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("rageval.toml"));

        // An explicitly requested config file must exist; the implicit
        // ./rageval.toml is optional and falls back to defaults.
        if !config_path.exists() {
            if std::env::var("RAGEVAL_CONFIG").is_ok() {
                anyhow::bail!("Configuration file not found: {}", config_path.display());
            }
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.trec_eval.timeout_secs == 0 {
            anyhow::bail!("trec_eval.timeout_secs must be greater than 0");
        }

        if self.trec_eval.binary_path.as_os_str().is_empty() {
            anyhow::bail!("trec_eval.binary_path must not be empty");
        }

        for (name, target) in &self.metrics.targets {
            if !target.is_finite() || *target < 0.0 {
                anyhow::bail!(
                    "metrics.targets.{} must be a finite non-negative number, got {}",
                    name,
                    target
                );
            }
        }

        Ok(())
    }

    /// Get absolute path to a data file (relative to data_dir)
    pub fn data_path(&self, relative: &Path) -> PathBuf {
        self.paths.data_dir.join(relative)
    }

    /// Get absolute path to an output file (relative to output_dir)
    pub fn output_path(&self, relative: &Path) -> PathBuf {
        self.paths.output_dir.join(relative)
    }

    /// Resolve a qrels argument: named entry from config, or a literal path
    pub fn resolve_qrels(&self, name_or_path: &str) -> PathBuf {
        match self.paths.qrels.get(name_or_path) {
            Some(rel) => self.data_path(rel),
            None => PathBuf::from(name_or_path),
        }
    }

    /// Resolve a topics argument: named entry from config, or a literal path
    pub fn resolve_topics(&self, name_or_path: &str) -> PathBuf {
        match self.paths.topics.get(name_or_path) {
            Some(rel) => self.data_path(rel),
            None => PathBuf::from(name_or_path),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trec_eval: TrecEvalConfig::default(),
            metrics: MetricsConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("rageval.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_from_full_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[trec_eval]
binary_path = "/usr/local/bin/trec_eval"
flags = ["-c"]
metrics = ["ndcg_cut", "recip_rank"]
timeout_secs = 60

[metrics]
primary = "ndcg_cut_10"

[metrics.targets]
ndcg_cut_10 = 0.45
recip_rank = 0.70

[paths]
data_dir = "/data/trec"
output_dir = "/out"

[paths.qrels]
rag24 = "qrels.rag24.txt"
"#,
        );

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.trec_eval.binary_path,
            PathBuf::from("/usr/local/bin/trec_eval")
        );
        assert_eq!(config.trec_eval.timeout_secs, 60);
        assert_eq!(config.metrics.targets["ndcg_cut_10"], 0.45);
        assert_eq!(
            config.resolve_qrels("rag24"),
            PathBuf::from("/data/trec/qrels.rag24.txt")
        );
        // Unknown names resolve as literal paths
        assert_eq!(
            config.resolve_qrels("some/other.txt"),
            PathBuf::from("some/other.txt")
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.trec_eval.binary_path, PathBuf::from("trec_eval"));
        assert_eq!(config.trec_eval.flags, vec!["-c".to_string()]);
        assert_eq!(config.trec_eval.timeout_secs, 120);
        assert_eq!(config.metrics.primary, "ndcg_cut_10");
        assert!(config.metrics.targets.is_empty());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[trec_eval]\ntimeout_secs = 0\n");
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_rejects_negative_target() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[metrics.targets]\nndcg_cut_10 = -0.5\n");
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("ndcg_cut_10"));
    }

    #[test]
    fn test_missing_file_error_includes_path() {
        let err = Config::load_from(Path::new("nonexistent/rageval.toml")).unwrap_err();
        assert!(err.to_string().contains("nonexistent"));
    }
}
