//! In-memory result store for tests/dev.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use docflow_core::{DocumentType, DocumentUploadId};

use super::{PlaceholderFailureRecord, ResultStore, StoredPlaceholder, TimelineRecord};
use crate::error::InfraError;

#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    placeholders: RwLock<BTreeMap<(DocumentType, DocumentUploadId), PlaceholderFailureRecord>>,
    timeline: RwLock<Vec<TimelineRecord>>,
    failing_timeline_writes: Mutex<u32>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholders(&self) -> Vec<PlaceholderFailureRecord> {
        self.placeholders
            .read()
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn placeholders_for(&self, id: &DocumentUploadId) -> Vec<PlaceholderFailureRecord> {
        self.placeholders()
            .into_iter()
            .filter(|p| &p.document_upload_id == id)
            .collect()
    }

    pub fn timeline(&self) -> Vec<TimelineRecord> {
        self.timeline.read().map(|t| t.clone()).unwrap_or_default()
    }

    /// Make the next `n` timeline writes fail.
    pub fn fail_next_timeline_writes(&self, n: u32) {
        if let Ok(mut failing) = self.failing_timeline_writes.lock() {
            *failing = n;
        }
    }
}

impl ResultStore for InMemoryResultStore {
    fn insert_placeholder_if_absent(
        &self,
        record: &PlaceholderFailureRecord,
    ) -> Result<StoredPlaceholder, InfraError> {
        let mut placeholders = self
            .placeholders
            .write()
            .map_err(InfraError::poisoned("result store"))?;
        let key = (record.document_type, record.document_upload_id.clone());
        if let Some(existing) = placeholders.get(&key) {
            return Ok(StoredPlaceholder {
                record: existing.clone(),
                inserted: false,
            });
        }
        placeholders.insert(key, record.clone());
        Ok(StoredPlaceholder {
            record: record.clone(),
            inserted: true,
        })
    }

    fn append_timeline(&self, record: &TimelineRecord) -> Result<(), InfraError> {
        {
            let mut failing = self
                .failing_timeline_writes
                .lock()
                .map_err(InfraError::poisoned("result store"))?;
            if *failing > 0 {
                *failing -= 1;
                return Err(InfraError::ResultStore("timeline write failed".to_string()));
            }
        }

        let mut timeline = self
            .timeline
            .write()
            .map_err(InfraError::poisoned("result store"))?;
        if !timeline
            .iter()
            .any(|t| t.timeline_for_id == record.timeline_for_id)
        {
            timeline.push(record.clone());
        }
        Ok(())
    }
}
