// Normalization pipeline: format detection, per-variant extraction,
// tabular reconciliation, and the batch driver feeding the store.

pub mod aliases;
pub mod batch;
pub mod detect;
pub mod markup;
pub mod resolver;
pub mod tabular;

pub use aliases::AliasTable;
pub use batch::{ingest_batch, BatchSummary, FileOutcome, SourceFile};
pub use detect::{detect, NormalizerKind};
