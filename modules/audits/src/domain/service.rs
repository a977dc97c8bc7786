//! Domain service - business logic orchestration

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::contract::{Audit, AuditError, AuditRequest, AuditSummary, CriterionInfo};
use crate::engine::{criteria, Auditor, EngineError};

use super::repository::AuditRepository;
use super::statistics::{
    self, AccessibilityByWcagLevel, AccessibilityLevels, AuditDetailStatistics, AuditStatistics,
    CriterionStatistics, GlobalStatistics, GroupStatistics, Report, SourceStatistics,
    TimelinePoint, UrlRanking, VerdictDistribution,
};

/// Domain service for audits and their statistics
pub struct Service {
    repo: Arc<dyn AuditRepository>,
    auditor: Arc<Auditor>,
}

/// Only absolute http(s) URLs with a host can be audited
pub fn validate_url(raw: &str) -> Result<url::Url, AuditError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuditError::validation("Field 'url' is required"));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| AuditError::validation(format!("Invalid url '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(AuditError::validation(format!(
            "Invalid url '{trimmed}': only http and https pages can be audited"
        )));
    }
    Ok(parsed)
}

impl Service {
    pub fn new(repo: Arc<dyn AuditRepository>, auditor: Arc<Auditor>) -> Self {
        Self { repo, auditor }
    }

    // ===== Audit Operations =====

    /// Fetch, evaluate and persist one page
    pub async fn run_audit(&self, mut request: AuditRequest) -> Result<Audit, AuditError> {
        validate_url(&request.url)?;
        request.url = request.url.trim().to_string();

        let run = self.auditor.run(&request).await.map_err(|e| match e {
            EngineError::Fetch(err) => {
                tracing::warn!(url = %request.url, error = %err, "page fetch failed");
                AuditError::Fetch {
                    url: request.url.clone(),
                    details: err.to_string(),
                }
            }
            other => {
                tracing::error!(url = %request.url, error = %other, "audit run failed");
                AuditError::Internal
            }
        })?;

        let audit = self.repo.create(run.to_new_audit()).await.map_err(|e| {
            tracing::error!(url = %request.url, error = %e, "failed to persist audit");
            AuditError::Unavailable {
                details: "Database unavailable while saving audit".to_string(),
            }
        })?;

        tracing::info!(id = audit.id, url = %audit.url, score = ?audit.score, "audit stored");
        Ok(audit)
    }

    pub async fn get_audit(&self, id: i64) -> Result<Audit, AuditError> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(|e| {
                tracing::error!(id, error = %e, "failed to load audit");
                AuditError::Internal
            })?
            .ok_or_else(|| AuditError::not_found(id))
    }

    /// Audit summaries, newest first
    pub async fn list_audits(&self) -> Result<Vec<AuditSummary>, AuditError> {
        let audits = self.load_all().await?;
        Ok(audits.iter().map(AuditSummary::from).collect())
    }

    pub async fn delete_audit(&self, id: i64) -> Result<(), AuditError> {
        let deleted = self.repo.delete(id).await.map_err(|e| {
            tracing::error!(id, error = %e, "failed to delete audit");
            AuditError::Unavailable {
                details: "Database unavailable while deleting audit".to_string(),
            }
        })?;
        if !deleted {
            return Err(AuditError::not_found(id));
        }
        tracing::info!(id, "audit deleted");
        Ok(())
    }

    /// Registered checks and the rest of the WCAG 2.1 catalogue
    pub fn catalogue(&self) -> Vec<CriterionInfo> {
        criteria::catalogue()
    }

    pub async fn export_csv(&self) -> Result<Vec<u8>, AuditError> {
        let audits = self.load_all().await?;
        super::export::audits_csv(&audits).map_err(|e| {
            tracing::error!(error = %e, "csv export failed");
            AuditError::Internal
        })
    }

    // ===== Statistics Operations =====

    async fn load_all(&self) -> Result<Vec<Audit>, AuditError> {
        self.repo.list_all().await.map_err(|e| {
            tracing::error!(error = %e, "failed to load audits");
            AuditError::Internal
        })
    }

    pub async fn audit_statistics(&self, id: i64) -> Result<AuditStatistics, AuditError> {
        let audit = self.get_audit(id).await?;
        Ok(statistics::audit_statistics(&audit))
    }

    pub async fn global_statistics(&self) -> Result<GlobalStatistics, AuditError> {
        Ok(statistics::global(&self.load_all().await?))
    }

    pub async fn verdict_distribution(&self) -> Result<VerdictDistribution, AuditError> {
        Ok(statistics::verdicts(&self.load_all().await?))
    }

    pub async fn criteria_statistics(&self) -> Result<Vec<CriterionStatistics>, AuditError> {
        Ok(statistics::criteria(&self.load_all().await?))
    }

    pub async fn level_statistics(&self) -> Result<BTreeMap<String, GroupStatistics>, AuditError> {
        Ok(statistics::levels(&self.load_all().await?))
    }

    pub async fn principle_statistics(
        &self,
    ) -> Result<BTreeMap<String, GroupStatistics>, AuditError> {
        Ok(statistics::principles(&self.load_all().await?))
    }

    pub async fn timeline(&self, days: usize) -> Result<Vec<TimelinePoint>, AuditError> {
        Ok(statistics::timeline(&self.load_all().await?, days))
    }

    pub async fn ranking(&self, limit: usize) -> Result<UrlRanking, AuditError> {
        Ok(statistics::ranking(&self.load_all().await?, limit))
    }

    pub async fn source_comparison(
        &self,
    ) -> Result<BTreeMap<String, SourceStatistics>, AuditError> {
        Ok(statistics::sources(&self.load_all().await?))
    }

    pub async fn audit_detail_statistics(
        &self,
        id: i64,
    ) -> Result<AuditDetailStatistics, AuditError> {
        let audit = self.get_audit(id).await?;
        Ok(statistics::audit_detail(&audit))
    }

    pub async fn report(&self) -> Result<Report, AuditError> {
        Ok(statistics::report(&self.load_all().await?))
    }

    pub async fn accessibility_levels(&self) -> Result<AccessibilityLevels, AuditError> {
        Ok(statistics::accessibility_levels(&self.load_all().await?))
    }

    pub async fn accessibility_by_wcag_level(
        &self,
    ) -> Result<AccessibilityByWcagLevel, AuditError> {
        Ok(statistics::accessibility_by_wcag_level(&self.load_all().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(validate_url("https://www.gob.pe").is_ok());
        assert!(validate_url("  http://example.org/path  ").is_ok());
        assert!(matches!(validate_url(""), Err(AuditError::Validation { .. })));
        assert!(matches!(validate_url("ftp://example.org"), Err(AuditError::Validation { .. })));
        assert!(matches!(validate_url("not a url"), Err(AuditError::Validation { .. })));
    }
}
