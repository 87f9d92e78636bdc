use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

use super::{RecordQuery, Storage};
use crate::domain::CanonicalRecord;
use crate::error::{IngestError, Result};

/// In-memory storage implementation for development/testing.
pub struct InMemoryStorage {
    records: Arc<Mutex<HashMap<Uuid, CanonicalRecord>>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn insert_record(&self, record: &mut CanonicalRecord) -> Result<()> {
        let id = Uuid::new_v4();
        record.id = Some(id);

        let mut records = self
            .records
            .lock()
            .map_err(|e| IngestError::Storage(e.to_string()))?;
        records.insert(id, record.clone());

        debug!(
            "Stored {} record {} with id {}",
            record.document_type.as_str(),
            record.document_number,
            id
        );
        Ok(())
    }

    async fn scan_records(&self, query: &RecordQuery) -> Result<Vec<CanonicalRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| IngestError::Storage(e.to_string()))?;
        let mut matched: Vec<CanonicalRecord> = records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
        matched.truncate(query.limit());
        Ok(matched)
    }

    async fn all_records(&self) -> Result<Vec<CanonicalRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| IngestError::Storage(e.to_string()))?;
        Ok(records.values().cloned().collect())
    }
}
