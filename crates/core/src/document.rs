//! Supported document types.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Declared type of an uploaded document.
///
/// Drives the placeholder record shape and the downstream queue. Anything
/// outside this set is rejected at the boundary instead of being routed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "invoice")]
    Invoice,
    #[serde(rename = "grn")]
    GoodsReceivedNote,
    #[serde(rename = "po")]
    PurchaseOrder,
    #[serde(rename = "medicalReferralLetter")]
    MedicalReferralLetter,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Invoice,
        DocumentType::GoodsReceivedNote,
        DocumentType::PurchaseOrder,
        DocumentType::MedicalReferralLetter,
    ];

    /// Wire name, as stored in the registry and carried in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::GoodsReceivedNote => "grn",
            DocumentType::PurchaseOrder => "po",
            DocumentType::MedicalReferralLetter => "medicalReferralLetter",
        }
    }
}

impl core::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::UnsupportedDocumentType(s.to_string()))
    }
}
