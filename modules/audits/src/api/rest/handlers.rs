//! HTTP request handlers - thin layer that delegates to domain service

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};

use super::{
    dto::*,
    error::{map_domain_error, Problem},
    mapper::audit_request,
};
use crate::domain::statistics::{
    AccessibilityByWcagLevel, AccessibilityLevels, AuditDetailStatistics, AuditStatistics,
    CriterionStatistics, GlobalStatistics, GroupStatistics, Report, SourceStatistics,
    TimelinePoint, UrlRanking, VerdictDistribution,
};
use crate::domain::Service;

const DEFAULT_TIMELINE_DAYS: usize = 30;
const DEFAULT_RANKING_LIMIT: usize = 10;

fn parse_count(name: &str, raw: Option<String>, default: usize) -> Result<usize, Problem> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<usize>().map_err(|_| {
            Problem::bad_request(format!("Query parameter '{name}' must be a non-negative integer"))
        }),
    }
}

fn audit_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, Problem> {
    let Path(id) = path.map_err(|e| Problem::bad_request(e.body_text()))?;
    Ok(id)
}

// ===== Audit Handlers =====

/// Run an audit and store it
pub async fn create_audit(
    Extension(service): Extension<Arc<Service>>,
    Query(query): Query<AuditModeQuery>,
    payload: Result<Json<AuditCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuditDto>), Problem> {
    let Json(body) = payload.map_err(|e| Problem::bad_request(e.body_text()))?;
    let request = audit_request(body, query);

    tracing::info!(url = %request.url, mode = request.mode.as_str(), ai = request.use_ai, "audit requested");
    let audit = service.run_audit(request).await.map_err(map_domain_error)?;

    Ok((StatusCode::CREATED, Json(audit.into())))
}

pub async fn list_audits(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<Vec<AuditSummaryDto>>, Problem> {
    let audits = service.list_audits().await.map_err(map_domain_error)?;
    Ok(Json(audits.into_iter().map(AuditSummaryDto::from).collect()))
}

pub async fn get_audit(
    Extension(service): Extension<Arc<Service>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<AuditDto>, Problem> {
    let id = audit_id(path)?;
    let audit = service.get_audit(id).await.map_err(map_domain_error)?;
    Ok(Json(audit.into()))
}

pub async fn delete_audit(
    Extension(service): Extension<Arc<Service>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, Problem> {
    let id = audit_id(path)?;
    service.delete_audit(id).await.map_err(map_domain_error)?;
    Ok(Json(DeleteResponse {
        detail: format!("Audit {id} deleted"),
    }))
}

pub async fn audit_statistics(
    Extension(service): Extension<Arc<Service>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<AuditStatistics>, Problem> {
    let id = audit_id(path)?;
    let stats = service.audit_statistics(id).await.map_err(map_domain_error)?;
    Ok(Json(stats))
}

pub async fn list_criteria(
    Extension(service): Extension<Arc<Service>>,
) -> Json<Vec<CriterionInfoDto>> {
    Json(service.catalogue().into_iter().map(CriterionInfoDto::from).collect())
}

pub async fn export_csv(
    Extension(service): Extension<Arc<Service>>,
) -> Result<impl IntoResponse, Problem> {
    let bytes = service.export_csv().await.map_err(map_domain_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"website_audits.csv\"",
            ),
        ],
        bytes,
    ))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ===== Statistics Handlers =====

pub async fn global_statistics(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<GlobalStatistics>, Problem> {
    Ok(Json(service.global_statistics().await.map_err(map_domain_error)?))
}

pub async fn verdict_distribution(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<VerdictDistribution>, Problem> {
    Ok(Json(service.verdict_distribution().await.map_err(map_domain_error)?))
}

pub async fn criteria_statistics(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<Vec<CriterionStatistics>>, Problem> {
    Ok(Json(service.criteria_statistics().await.map_err(map_domain_error)?))
}

pub async fn level_statistics(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<BTreeMap<String, GroupStatistics>>, Problem> {
    Ok(Json(service.level_statistics().await.map_err(map_domain_error)?))
}

pub async fn principle_statistics(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<BTreeMap<String, GroupStatistics>>, Problem> {
    Ok(Json(service.principle_statistics().await.map_err(map_domain_error)?))
}

pub async fn timeline(
    Extension(service): Extension<Arc<Service>>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Vec<TimelinePoint>>, Problem> {
    let days = parse_count("days", query.days, DEFAULT_TIMELINE_DAYS)?;
    Ok(Json(service.timeline(days).await.map_err(map_domain_error)?))
}

pub async fn ranking(
    Extension(service): Extension<Arc<Service>>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<UrlRanking>, Problem> {
    let limit = parse_count("limit", query.limit, DEFAULT_RANKING_LIMIT)?;
    Ok(Json(service.ranking(limit).await.map_err(map_domain_error)?))
}

pub async fn source_comparison(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<BTreeMap<String, SourceStatistics>>, Problem> {
    Ok(Json(service.source_comparison().await.map_err(map_domain_error)?))
}

pub async fn audit_detail_statistics(
    Extension(service): Extension<Arc<Service>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<AuditDetailStatistics>, Problem> {
    let id = audit_id(path)?;
    Ok(Json(
        service
            .audit_detail_statistics(id)
            .await
            .map_err(map_domain_error)?,
    ))
}

pub async fn report(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<Report>, Problem> {
    Ok(Json(service.report().await.map_err(map_domain_error)?))
}

pub async fn accessibility_levels(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<AccessibilityLevels>, Problem> {
    Ok(Json(service.accessibility_levels().await.map_err(map_domain_error)?))
}

pub async fn accessibility_by_wcag_level(
    Extension(service): Extension<Arc<Service>>,
) -> Result<Json<AccessibilityByWcagLevel>, Problem> {
    Ok(Json(
        service
            .accessibility_by_wcag_level()
            .await
            .map_err(map_domain_error)?,
    ))
}
