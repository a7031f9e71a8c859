//! Store for extraction result records (placeholders and timeline).

pub mod in_memory;
pub mod placeholder;
pub mod postgres;

use std::sync::Arc;

use crate::error::InfraError;

pub use in_memory::InMemoryResultStore;
pub use placeholder::{
    FailedDocument, PlaceholderFailureRecord, PlaceholderTemplate, TimelineRecord, template_for,
};
pub use postgres::PostgresResultStore;

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlaceholder {
    /// The record now in the store: the new one, or the one a previous
    /// attempt wrote.
    pub record: PlaceholderFailureRecord,
    pub inserted: bool,
}

pub trait ResultStore: Send + Sync {
    /// Insert unless a placeholder with the same `(document_type,
    /// document_upload_id)` exists.
    fn insert_placeholder_if_absent(
        &self,
        record: &PlaceholderFailureRecord,
    ) -> Result<StoredPlaceholder, InfraError>;

    /// Appending twice for the same placeholder keeps one entry.
    fn append_timeline(&self, record: &TimelineRecord) -> Result<(), InfraError>;
}

impl<S> ResultStore for Arc<S>
where
    S: ResultStore + ?Sized,
{
    fn insert_placeholder_if_absent(
        &self,
        record: &PlaceholderFailureRecord,
    ) -> Result<StoredPlaceholder, InfraError> {
        (**self).insert_placeholder_if_absent(record)
    }

    fn append_timeline(&self, record: &TimelineRecord) -> Result<(), InfraError> {
        (**self).append_timeline(record)
    }
}
