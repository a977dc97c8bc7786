//! Native client trait for inter-module communication
//!
//! This trait defines the API that other modules use to run and read audits
//! in-process, without going through HTTP.

use super::{
    error::AuditError,
    model::{Audit, AuditRequest, AuditSummary},
};
use async_trait::async_trait;

/// Audits API for inter-module communication
#[async_trait]
pub trait AuditsApi: Send + Sync {
    /// Fetch, evaluate and persist a page audit
    async fn run_audit(&self, request: AuditRequest) -> Result<Audit, AuditError>;

    /// Get a stored audit with its criterion results
    async fn get_audit(&self, id: i64) -> Result<Audit, AuditError>;

    /// List stored audits, newest first
    async fn list_audits(&self) -> Result<Vec<AuditSummary>, AuditError>;

    /// Delete an audit and its results
    async fn delete_audit(&self, id: i64) -> Result<(), AuditError>;
}
