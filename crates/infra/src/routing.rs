//! Document type registry.
//!
//! Everything type-specific lives here: which queue receives a finished
//! document and what its placeholder looks like. The polling state machine
//! never branches on document type.

use std::collections::HashMap;

use docflow_core::{DocumentType, DomainError, DomainResult, TenantId};

use crate::config::QueueConfig;
use crate::results::{PlaceholderTemplate, template_for};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRoute {
    pub document_type: DocumentType,
    pub queue: String,
    pub placeholder: &'static PlaceholderTemplate,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentRoutes {
    routes: HashMap<DocumentType, DocumentRoute>,
    tenant_queues: HashMap<(TenantId, DocumentType), String>,
}

impl DocumentRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// One route per supported type, queues from configuration.
    pub fn from_config(queues: &QueueConfig) -> Self {
        let mut routes = DocumentType::ALL
            .into_iter()
            .fold(Self::new(), |routes, document_type| {
                routes.register(document_type, queues.queue_for(document_type))
            });

        for (tenant_id, queue) in &queues.invoice_overrides {
            routes = routes.with_tenant_queue(tenant_id.clone(), DocumentType::Invoice, queue.clone());
        }
        routes
    }

    pub fn register(mut self, document_type: DocumentType, queue: impl Into<String>) -> Self {
        self.routes.insert(
            document_type,
            DocumentRoute {
                document_type,
                queue: queue.into(),
                placeholder: template_for(document_type),
            },
        );
        self
    }

    pub fn with_tenant_queue(
        mut self,
        tenant_id: TenantId,
        document_type: DocumentType,
        queue: impl Into<String>,
    ) -> Self {
        self.tenant_queues
            .insert((tenant_id, document_type), queue.into());
        self
    }

    /// Parse a raw type name and make sure it is routable.
    pub fn resolve(&self, raw: &str) -> DomainResult<&DocumentRoute> {
        let document_type: DocumentType = raw.parse()?;
        self.route(document_type)
    }

    pub fn route(&self, document_type: DocumentType) -> DomainResult<&DocumentRoute> {
        self.routes
            .get(&document_type)
            .ok_or_else(|| DomainError::UnsupportedDocumentType(document_type.to_string()))
    }

    /// Queue for one tenant's document; tenant overrides win.
    pub fn queue_for(&self, tenant_id: &TenantId, document_type: DocumentType) -> DomainResult<&str> {
        let route = self.route(document_type)?;
        Ok(self
            .tenant_queues
            .get(&(tenant_id.clone(), document_type))
            .map(String::as_str)
            .unwrap_or(route.queue.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantId {
        TenantId::parse(id).unwrap()
    }

    #[test]
    fn every_type_routes_to_its_own_queue() {
        let routes = DocumentRoutes::from_config(&QueueConfig::default());
        let a = tenant("tenant-a");

        assert_eq!(routes.queue_for(&a, DocumentType::Invoice).unwrap(), "docflow-invoice");
        assert_eq!(routes.queue_for(&a, DocumentType::GoodsReceivedNote).unwrap(), "docflow-grn");
        assert_eq!(routes.queue_for(&a, DocumentType::PurchaseOrder).unwrap(), "docflow-po");
        assert_eq!(
            routes.queue_for(&a, DocumentType::MedicalReferralLetter).unwrap(),
            "docflow-medical-referral-letter"
        );
    }

    #[test]
    fn tenant_override_only_affects_that_tenant() {
        let mut queues = QueueConfig::default();
        queues
            .invoice_overrides
            .insert(tenant("BR"), "br-invoices".to_string());
        let routes = DocumentRoutes::from_config(&queues);

        assert_eq!(routes.queue_for(&tenant("BR"), DocumentType::Invoice).unwrap(), "br-invoices");
        assert_eq!(routes.queue_for(&tenant("BR"), DocumentType::PurchaseOrder).unwrap(), "docflow-po");
        assert_eq!(routes.queue_for(&tenant("XY"), DocumentType::Invoice).unwrap(), "docflow-invoice");
    }

    #[test]
    fn unknown_or_unregistered_types_are_rejected() {
        let routes = DocumentRoutes::new().register(DocumentType::Invoice, "q");

        assert!(matches!(
            routes.resolve("receipt"),
            Err(DomainError::UnsupportedDocumentType(_))
        ));
        assert!(matches!(
            routes.resolve("grn"),
            Err(DomainError::UnsupportedDocumentType(_))
        ));
        assert_eq!(routes.resolve("invoice").unwrap().queue, "q");
    }
}
