//! In-memory object store for tests/dev.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use super::ObjectStore;
use crate::error::InfraError;

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    failing_copies: Mutex<u32>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((bucket.to_string(), key.to_string()), body.into());
        }
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    /// Make the next `n` copies fail.
    pub fn fail_next_copies(&self, n: u32) {
        if let Ok(mut failing) = self.failing_copies.lock() {
            *failing = n;
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, InfraError> {
        let objects = self
            .objects
            .read()
            .map_err(InfraError::poisoned("object store"))?;
        Ok(objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool, InfraError> {
        let objects = self
            .objects
            .read()
            .map_err(InfraError::poisoned("object store"))?;
        Ok(objects.contains_key(&(bucket.to_string(), key.to_string())))
    }

    fn copy(&self, bucket: &str, from: &str, to: &str) -> Result<(), InfraError> {
        {
            let mut failing = self
                .failing_copies
                .lock()
                .map_err(InfraError::poisoned("object store"))?;
            if *failing > 0 {
                *failing -= 1;
                return Err(InfraError::ObjectStore(format!("copy {from} -> {to} failed")));
            }
        }

        let mut objects = self
            .objects
            .write()
            .map_err(InfraError::poisoned("object store"))?;
        let body = objects
            .get(&(bucket.to_string(), from.to_string()))
            .cloned()
            .ok_or_else(|| InfraError::ObjectStore(format!("no such key: {bucket}/{from}")))?;
        objects.insert((bucket.to_string(), to.to_string()), body);
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), InfraError> {
        let mut objects = self
            .objects
            .write()
            .map_err(InfraError::poisoned("object store"))?;
        objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
