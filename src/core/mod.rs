pub mod activity;
pub mod ingest;
pub mod keylock;
pub mod parser;
pub mod reconcile;

pub use ingest::{BatchReport, IngestOutcome, IngestSettings, Ingestor, RetryPolicy};
pub use parser::{ParseRejection, parse_filename, parse_path};
pub use reconcile::{Applied, MergeRejection, Reconciliation, reconcile, reconcile_and_write};
