//! In-memory upload registry for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use docflow_core::{DocumentUploadId, JobHandle};
use docflow_jobs::FailureReason;

use super::{JobProgress, UploadEntry, UploadRegistry, UploadStatus};
use crate::error::InfraError;

#[derive(Debug, Default)]
pub struct InMemoryUploadRegistry {
    entries: RwLock<HashMap<DocumentUploadId, UploadEntry>>,
    failing_writes: AtomicUsize,
}

impl InMemoryUploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: UploadEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(entry.document_upload_id.clone(), entry);
        }
    }

    /// Fail the next `n` writes with a registry error.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    fn update<F>(&self, id: &DocumentUploadId, f: F) -> Result<(), InfraError>
    where
        F: FnOnce(&mut UploadEntry),
    {
        let failing = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(InfraError::Registry("registry unavailable".to_string()));
        }

        let mut entries = self
            .entries
            .write()
            .map_err(InfraError::poisoned("upload registry"))?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| InfraError::Registry(format!("no registry entry for {id}")))?;
        f(entry);
        Ok(())
    }
}

impl UploadRegistry for InMemoryUploadRegistry {
    fn get(&self, id: &DocumentUploadId) -> Result<Option<UploadEntry>, InfraError> {
        let entries = self
            .entries
            .read()
            .map_err(InfraError::poisoned("upload registry"))?;
        Ok(entries.get(id).cloned())
    }

    fn mark_in_progress(&self, id: &DocumentUploadId, handle: &JobHandle) -> Result<(), InfraError> {
        self.update(id, |entry| {
            entry.status = UploadStatus::InProgress;
            entry.job_handle = Some(handle.clone());
            entry.progress = Some(JobProgress::Submitted);
        })
    }

    fn mark_progress(&self, id: &DocumentUploadId, progress: JobProgress) -> Result<(), InfraError> {
        self.update(id, |entry| entry.progress = Some(progress))
    }

    fn mark_failed(&self, id: &DocumentUploadId, reason: FailureReason) -> Result<(), InfraError> {
        self.update(id, |entry| {
            entry.status = UploadStatus::Fail;
            entry.exception_status = Some(reason.as_str().to_string());
            entry.progress = None;
        })
    }
}
