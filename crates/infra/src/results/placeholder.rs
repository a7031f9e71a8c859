//! Placeholder failure records.
//!
//! When a job fails, downstream review screens still need a row for the
//! document. The placeholder has the full shape of a real extraction result
//! for its type, with every domain field set to `"-"` (text) or `0` (amounts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use uuid::Uuid;

use docflow_core::{DocumentType, DocumentUploadId, TenantId};
use docflow_jobs::FailureReason;

const SYSTEM_ACTOR: &str = "System";
const EXCEPTIONS_STATUS: &str = "Exceptions";
const TIMELINE_TITLE: &str = "Document Processing Failed";

/// Record shape for one document type.
#[derive(Debug, PartialEq, Eq)]
pub struct PlaceholderTemplate {
    pub document_type: DocumentType,
    /// Collection (table) the extraction results of this type live in.
    pub collection: &'static str,
    pub id_field: &'static str,
    pub status_field: &'static str,
    pub text_fields: &'static [&'static str],
    pub amount_fields: &'static [&'static str],
    pub map_fields: &'static [&'static str],
    /// Failures of this type also get a timeline entry.
    pub records_timeline: bool,
}

pub const INVOICE: PlaceholderTemplate = PlaceholderTemplate {
    document_type: DocumentType::Invoice,
    collection: "extracted_documents",
    id_field: "extractedDocumentsId",
    status_field: "documentStatus",
    text_fields: &[
        "invoiceNumber",
        "invoiceDate",
        "supplierName",
        "supplierAddress",
        "supplierCode",
        "buyerName",
        "buyerAddress",
        "buyerCode",
        "purchaseOrderNo",
        "paymentTerms",
        "currency",
        "taxType",
        "taxRate",
        "dueDate",
    ],
    amount_fields: &["totalInvoiceAmount", "taxAmount"],
    map_fields: &[],
    records_timeline: true,
};

pub const GOODS_RECEIVED_NOTE: PlaceholderTemplate = PlaceholderTemplate {
    document_type: DocumentType::GoodsReceivedNote,
    collection: "extracted_grn",
    id_field: "extractedGrnId",
    status_field: "documentStatus",
    text_fields: &[
        "grnNumber",
        "grnDate",
        "supplierName",
        "supplierAddress",
        "supplierCode",
        "purchaseOrderNo",
        "statusOfGoodsReceived",
    ],
    amount_fields: &[],
    map_fields: &[],
    records_timeline: false,
};

pub const PURCHASE_ORDER: PlaceholderTemplate = PlaceholderTemplate {
    document_type: DocumentType::PurchaseOrder,
    collection: "extracted_po",
    id_field: "extractedPoId",
    status_field: "documentStatus",
    text_fields: &[
        "poNumber",
        "poDate",
        "deliveryAddress",
        "requestDeliveryDate",
        "paymentTerms",
        "supplierName",
        "supplierAddress",
        "supplierCode",
        "buyerName",
        "buyerAddress",
        "buyerCode",
        "currency",
        "taxType",
        "taxRate",
    ],
    amount_fields: &["totalAmountWithTax", "totalTaxAmount"],
    map_fields: &[],
    records_timeline: false,
};

pub const MEDICAL_REFERRAL_LETTER: PlaceholderTemplate = PlaceholderTemplate {
    document_type: DocumentType::MedicalReferralLetter,
    collection: "extracted_referral_letters",
    id_field: "extractedReferralLetterId",
    status_field: "status",
    text_fields: &[
        "patientDiagnosis",
        "patientEmail",
        "patientIdentificationNumber",
        "patientName",
        "patientPhoneNumber",
        "patientReasonForReferral",
        "preliminaryWorkUps",
        "receivingDoctorDepartment",
        "receivingDoctorEmail",
        "receivingDoctorName",
        "receivingDoctorPhoneNumber",
        "sendingDoctorAddress",
        "sendingDoctorDepartment",
        "sendingDoctorEmail",
        "sendingDoctorName",
        "sendingDoctorPhoneNumber",
    ],
    amount_fields: &[],
    map_fields: &["confidenceScores"],
    records_timeline: false,
};

pub fn template_for(document_type: DocumentType) -> &'static PlaceholderTemplate {
    match document_type {
        DocumentType::Invoice => &INVOICE,
        DocumentType::GoodsReceivedNote => &GOODS_RECEIVED_NOTE,
        DocumentType::PurchaseOrder => &PURCHASE_ORDER,
        DocumentType::MedicalReferralLetter => &MEDICAL_REFERRAL_LETTER,
    }
}

/// The document a failure is recorded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub document_upload_id: DocumentUploadId,
    pub document_type: DocumentType,
    pub tenant_id: TenantId,
    pub file_name: String,
    pub source_path: String,
}

/// A fully populated placeholder, ready to store.
///
/// Identity for idempotency is `(document_type, document_upload_id)`; the
/// generated `record_id` differs between attempts and is never used to
/// deduplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderFailureRecord {
    pub record_id: Uuid,
    pub collection: String,
    pub document_type: DocumentType,
    pub document_upload_id: DocumentUploadId,
    pub tenant_id: TenantId,
    pub reason: FailureReason,
    pub created_at: DateTime<Utc>,
    pub body: JsonValue,
}

impl PlaceholderFailureRecord {
    pub fn build(
        template: &PlaceholderTemplate,
        document: &FailedDocument,
        reason: FailureReason,
        now: DateTime<Utc>,
    ) -> Self {
        let record_id = Uuid::now_v7();
        let timestamp = now.to_rfc3339();

        let mut body = Map::new();
        body.insert(template.id_field.to_string(), json!(record_id.to_string()));
        body.insert("tenantId".to_string(), json!(document.tenant_id));
        body.insert("documentType".to_string(), json!(document.document_type));
        for field in template.text_fields {
            body.insert(field.to_string(), json!("-"));
        }
        for field in template.amount_fields {
            body.insert(field.to_string(), json!(0));
        }
        for field in template.map_fields {
            body.insert(field.to_string(), json!({}));
        }
        body.insert(template.status_field.to_string(), json!(EXCEPTIONS_STATUS));
        body.insert("exceptionStatus".to_string(), json!(reason.as_str()));
        body.insert("remarks".to_string(), json!(""));
        body.insert("boundingBoxes".to_string(), json!("{}"));
        body.insert("createdAt".to_string(), json!(timestamp));
        body.insert("createdBy".to_string(), json!(SYSTEM_ACTOR));
        body.insert("updatedAt".to_string(), json!(timestamp));
        body.insert("updatedBy".to_string(), json!(SYSTEM_ACTOR));
        body.insert("approvedAt".to_string(), json!(""));
        body.insert("approvedBy".to_string(), json!(""));
        body.insert("sourceFile".to_string(), json!(document.file_name));
        body.insert("filePath".to_string(), json!(document.source_path));
        body.insert("confidenceScore".to_string(), json!(0));
        body.insert(
            "documentUploadId".to_string(),
            json!(document.document_upload_id),
        );

        Self {
            record_id,
            collection: template.collection.to_string(),
            document_type: document.document_type,
            document_upload_id: document.document_upload_id.clone(),
            tenant_id: document.tenant_id.clone(),
            reason,
            created_at: now,
            body: JsonValue::Object(body),
        }
    }

    pub fn natural_key(&self) -> (DocumentType, &DocumentUploadId) {
        (self.document_type, &self.document_upload_id)
    }
}

/// Timeline entry announcing a failed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRecord {
    pub timeline_id: Uuid,
    pub tenant_id: TenantId,
    pub timeline_for_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: DocumentType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub invoice_number: String,
    pub supplier_name: String,
}

impl TimelineRecord {
    pub fn for_placeholder(record: &PlaceholderFailureRecord) -> Self {
        let text = |field: &str| {
            record
                .body
                .get(field)
                .and_then(JsonValue::as_str)
                .unwrap_or("-")
                .to_string()
        };

        Self {
            timeline_id: Uuid::now_v7(),
            tenant_id: record.tenant_id.clone(),
            timeline_for_id: record.record_id,
            title: TIMELINE_TITLE.to_string(),
            kind: record.document_type,
            description: record.reason.as_str().to_string(),
            created_at: record.created_at,
            created_by: SYSTEM_ACTOR.to_string(),
            updated_at: record.created_at,
            updated_by: SYSTEM_ACTOR.to_string(),
            invoice_number: text("invoiceNumber"),
            supplier_name: text("supplierName"),
        }
    }
}
