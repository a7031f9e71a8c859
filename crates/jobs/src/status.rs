//! Classification of raw status strings reported by the extraction service.

use serde::{Deserialize, Serialize};

/// Status of an extraction job as seen by one status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Accepted and not finished yet.
    Running,
    /// Finished; results are in the output location.
    Succeeded,
    /// The service marked the job failed.
    Failed,
    /// A value outside the known vocabulary.
    Unexpected { raw: String },
}

impl ExtractionStatus {
    /// Map a raw status string onto the known vocabulary.
    ///
    /// Anything unrecognized becomes `Unexpected`, which callers must treat
    /// as a failure. It never means "keep waiting".
    pub fn classify(raw: &str) -> Self {
        match raw {
            "Created" | "InProgress" => ExtractionStatus::Running,
            "Success" | "Succeeded" => ExtractionStatus::Succeeded,
            "Failed" | "ServiceError" | "ClientError" => ExtractionStatus::Failed,
            other => ExtractionStatus::Unexpected {
                raw: other.to_string(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExtractionStatus::Running)
    }
}
