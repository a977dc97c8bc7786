//! Repository trait for data access
//!
//! Implementations are in infra/storage/repositories.rs

use crate::contract::{Audit, NewAudit};
use anyhow::Result;
use async_trait::async_trait;

/// Repository for audits and their criterion results
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Insert an audit with all its results atomically
    async fn create(&self, audit: NewAudit) -> Result<Audit>;

    /// Find an audit with its results
    async fn find_by_id(&self, id: i64) -> Result<Option<Audit>>;

    /// All audits with their results, newest first
    async fn list_all(&self) -> Result<Vec<Audit>>;

    /// Delete an audit and its results; `false` when it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;
}
