use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rageval
#[derive(Error, Debug)]
pub enum RagevalError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required input file missing (qrels, run, topics, baseline)
    #[error("Input file not found: {0}")]
    InputMissing(PathBuf),

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// External evaluator failure (non-zero exit, timeout); carries diagnostics
    #[error("trec_eval error: {0}")]
    Evaluator(String),

    /// Report construction invariant violation (status counts vs metric list)
    #[error("Invalid evaluation report: {0}")]
    InvalidReport(String),
}

/// Convenient Result type using RagevalError
pub type Result<T> = std::result::Result<T, RagevalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagevalError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RagevalError = io_err.into();
        assert!(matches!(err, RagevalError::Io(_)));
    }

    #[test]
    fn test_input_missing_includes_path() {
        let err = RagevalError::InputMissing(PathBuf::from("/tmp/qrels.txt"));
        assert!(err.to_string().contains("/tmp/qrels.txt"));
    }
}
