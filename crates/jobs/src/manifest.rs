//! Output manifest: the canonical result objects of a finished job.

use serde::{Deserialize, Serialize};

/// Object name the object store drops to verify write access.
const ACCESS_CHECK_MARKER: &str = ".s3_access_check";

/// Path segment under which the service writes project-specific results.
const RESULT_SEGMENT: &str = "custom_output";

/// Ordered list of result object keys.
///
/// Order is lexicographic by key. Downstream consumers merge multi-segment
/// outputs in this order, so it must be deterministic regardless of the order
/// the store listed objects in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputManifest {
    keys: Vec<String>,
}

impl OutputManifest {
    /// Filter and order a raw object listing.
    pub fn from_listing<I, S>(listing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = listing
            .into_iter()
            .map(Into::into)
            .filter(|k| is_canonical_result(k))
            .collect();
        keys.sort();
        keys.dedup();
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// `true` for `.../custom_output/.../result.json` and `result-<n>.json` objects.
pub fn is_canonical_result(key: &str) -> bool {
    let mut segments = key.split('/');
    let Some(file_name) = segments.next_back() else {
        return false;
    };

    if file_name == ACCESS_CHECK_MARKER || !segments.any(|s| s == RESULT_SEGMENT) {
        return false;
    }

    let Some(stem) = file_name.strip_suffix(".json") else {
        return false;
    };
    match stem.strip_prefix("result") {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}
