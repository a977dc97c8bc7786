//! Native client implementation - wraps domain service for in-process calls

use crate::contract::{Audit, AuditError, AuditRequest, AuditSummary, AuditsApi};
use crate::domain::Service;
use async_trait::async_trait;
use std::sync::Arc;

/// Native client implementation that directly calls the domain service
///
/// Used for in-process communication without HTTP overhead.
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<Service>,
}

impl NativeClient {
    /// Create a new native client
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AuditsApi for NativeClient {
    async fn run_audit(&self, request: AuditRequest) -> Result<Audit, AuditError> {
        self.service.run_audit(request).await
    }

    async fn get_audit(&self, id: i64) -> Result<Audit, AuditError> {
        self.service.get_audit(id).await
    }

    async fn list_audits(&self) -> Result<Vec<AuditSummary>, AuditError> {
        self.service.list_audits().await
    }

    async fn delete_audit(&self, id: i64) -> Result<(), AuditError> {
        self.service.delete_audit(id).await
    }
}
