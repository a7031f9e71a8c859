//! Moves a processed source document from the input area to the processed area.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::InfraError;
use crate::object_store::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relocation {
    Moved { to: String },
    /// Source already gone; an earlier attempt moved it.
    AlreadyMoved { to: String },
}

pub struct SourceRelocator {
    objects: Arc<dyn ObjectStore>,
    input_prefix: String,
    processed_prefix: String,
}

impl SourceRelocator {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        input_prefix: impl Into<String>,
        processed_prefix: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            input_prefix: input_prefix.into(),
            processed_prefix: processed_prefix.into(),
        }
    }

    /// Swap the leading input prefix for the processed one; other keys keep
    /// their path under the processed prefix.
    pub fn processed_key(&self, key: &str) -> String {
        match key
            .strip_prefix(self.input_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(rest) => format!("{}/{}", self.processed_prefix, rest),
            None => format!("{}/{}", self.processed_prefix, key),
        }
    }

    /// Copy then delete. Safe to repeat after a partial failure.
    pub fn relocate(&self, bucket: &str, key: &str) -> Result<Relocation, InfraError> {
        let to = self.processed_key(key);

        if !self.objects.exists(bucket, key)? {
            debug!(bucket, key, to = %to, "source already relocated");
            return Ok(Relocation::AlreadyMoved { to });
        }

        self.objects.copy(bucket, key, &to)?;
        self.objects.delete(bucket, key)?;
        info!(bucket, from = key, to = %to, "source relocated");
        Ok(Relocation::Moved { to })
    }
}
