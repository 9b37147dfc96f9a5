//! Data model for the evaluation harness: TREC runs, evaluation reports,
//! topics, and the retrieval-result input shape consumed by the run builder.

pub mod reports;
pub mod response;
pub mod runs;
pub mod topics;

pub use reports::{EvaluationReport, MetricStatus, MetricValue, StatusCounts};
pub use response::{QueryResult, RetrievedSegment};
pub use runs::{RunMetadata, TrecRun, TrecRunRow};
pub use topics::{Topic, TopicFormat, TopicSet};
