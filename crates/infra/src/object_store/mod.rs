//! Object storage holding source documents and extraction output.

pub mod in_memory;
pub mod local;

use std::sync::Arc;

use crate::error::InfraError;

pub use in_memory::InMemoryObjectStore;
pub use local::LocalObjectStore;

pub trait ObjectStore: Send + Sync {
    /// Keys under `prefix`, in no particular order.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, InfraError>;

    fn exists(&self, bucket: &str, key: &str) -> Result<bool, InfraError>;

    /// Copy within one bucket, overwriting `to`.
    fn copy(&self, bucket: &str, from: &str, to: &str) -> Result<(), InfraError>;

    /// Deleting a missing key succeeds.
    fn delete(&self, bucket: &str, key: &str) -> Result<(), InfraError>;
}

impl<S> ObjectStore for Arc<S>
where
    S: ObjectStore + ?Sized,
{
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, InfraError> {
        (**self).list(bucket, prefix)
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool, InfraError> {
        (**self).exists(bucket, key)
    }

    fn copy(&self, bucket: &str, from: &str, to: &str) -> Result<(), InfraError> {
        (**self).copy(bucket, from, to)
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), InfraError> {
        (**self).delete(bucket, key)
    }
}
