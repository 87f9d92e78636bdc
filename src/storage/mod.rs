pub mod in_memory;

pub use in_memory::InMemoryStorage;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{CanonicalRecord, DocumentType};
use crate::error::Result;

pub const DEFAULT_SCAN_LIMIT: usize = 1000;

/// Conjunctive filter over canonical records. Dates are inclusive string
/// bounds over the ISO-8601 issue date; `tax_id` matches the issuer or the
/// receiver side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordQuery {
    pub document_type: Option<DocumentType>,
    pub issue_date_from: Option<String>,
    pub issue_date_to: Option<String>,
    pub tax_id: Option<String>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        if let Some(document_type) = self.document_type {
            if record.document_type != document_type {
                return false;
            }
        }
        if let Some(from) = &self.issue_date_from {
            if record.issue_date.as_str() < from.as_str() {
                return false;
            }
        }
        if let Some(to) = &self.issue_date_to {
            if record.issue_date.as_str() > to.as_str() {
                return false;
            }
        }
        if let Some(tax_id) = &self.tax_id {
            if &record.issuer_tax_id != tax_id && &record.receiver_tax_id != tax_id {
                return false;
            }
        }
        true
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SCAN_LIMIT)
    }
}

/// Storage trait for persisting canonical records.
///
/// The handle is injected into the pipeline and owned by the host; the core
/// only needs append-only insertion and a predicate-filtered ordered scan.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a record, assigning its id. Records are never updated or
    /// deleted afterwards.
    async fn insert_record(&self, record: &mut CanonicalRecord) -> Result<()>;

    /// Filtered scan, ordered by issue date descending, truncated to the
    /// query limit.
    async fn scan_records(&self, query: &RecordQuery) -> Result<Vec<CanonicalRecord>>;

    /// Every stored record, for the aggregation engine.
    async fn all_records(&self) -> Result<Vec<CanonicalRecord>>;
}
