//! REST DTOs with serde derives for HTTP API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ===== Audit DTOs =====

/// Audit submission body
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuditCreateRequest {
    /// Absolute http(s) URL of the page to audit
    #[schema(example = "https://www.gob.pe")]
    pub url: Option<String>,

    /// raw, rendered, ai or auto; unknown values fall back to raw
    #[schema(example = "auto")]
    pub mode: Option<String>,

    /// Extra AI review on criteria where it helps; bool or "1"/"true"/"yes"
    #[schema(value_type = Option<bool>)]
    pub ai: Option<serde_json::Value>,

    /// Restrict the run to these WCAG codes
    pub codes: Option<Vec<String>>,
}

/// Query overrides for an audit submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditModeQuery {
    pub mode: Option<String>,
    pub ai: Option<String>,
}

/// Stored criterion result
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CriterionResultDto {
    #[schema(example = "1.1.1")]
    pub code: String,
    pub title: String,
    /// A, AA or AAA
    pub level: Option<String>,
    pub principle: Option<String>,
    /// pass, fail, partial or na
    pub verdict: String,
    /// raw, rendered, ai or mixed
    pub source: String,
    /// 2 pass, 1 partial, 0 fail, null when not applicable
    pub score: Option<i16>,
    pub score_hint: Option<f64>,
    pub details: serde_json::Value,
}

/// Full audit detail
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditDto {
    pub id: i64,
    pub url: String,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub status_code: Option<u16>,
    pub elapsed_ms: Option<i64>,
    pub page_title: Option<String>,
    /// Coverage-penalized score on the 0..2 scale
    pub score: Option<f64>,
    pub results: serde_json::Value,
    pub raw: bool,
    pub rendered: bool,
    pub ai: bool,
    pub criterion_results: Vec<CriterionResultDto>,
}

/// Verdict tally of one audit
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct VerdictCountsDto {
    pub pass: u64,
    pub fail: u64,
    pub partial: u64,
    pub na: u64,
}

/// Row of the audit listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditSummaryDto {
    pub id: i64,
    pub url: String,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub page_title: Option<String>,
    pub score: Option<f64>,
    pub status_code: Option<u16>,
    pub elapsed_ms: Option<i64>,
    pub rendered: bool,
    /// RAW, RENDERED or AI
    #[schema(example = "RAW")]
    pub mode_effective: String,
    pub verdict_counts: VerdictCountsDto,
    pub rendered_codes_count: usize,
    pub ai_codes_count: usize,
}

/// Catalogue entry
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CriterionInfoDto {
    pub code: String,
    pub title: String,
    pub level: String,
    pub principle: String,
    pub implemented: bool,
}

// ===== Misc DTOs =====

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// `days` for the timeline, kept raw so bad input maps to a problem response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineQuery {
    pub days: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<String>,
}
