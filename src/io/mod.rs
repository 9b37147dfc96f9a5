//! File I/O: qrels, TREC run files, and topic files.

pub mod qrels;
pub mod runs;
pub mod topics;

pub use qrels::{load_qrels, QrelEntry, Qrels, QrelsStats};
pub use runs::{build_trec_run, read_trec_run, write_trec_run, RunReadStats};
pub use topics::load_topics;
