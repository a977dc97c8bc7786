//! Mapper implementations for converting between DTOs and contract models

use super::dto::*;
use crate::contract::{
    self, AuditRequest, CheckMode, CriterionInfo, CriterionResult, VerdictCounts,
};

/// "1", "true" and "yes" enable the flag, case-insensitively
pub fn parse_flag(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64() == Some(1),
        serde_json::Value::String(s) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        }
        _ => false,
    }
}

/// Query parameters win over the body
pub fn audit_request(body: AuditCreateRequest, query: AuditModeQuery) -> AuditRequest {
    let mode = query
        .mode
        .or(body.mode)
        .map(|m| CheckMode::parse(&m))
        .unwrap_or(CheckMode::Raw);
    let use_ai = match query.ai {
        Some(flag) => parse_flag(&serde_json::Value::String(flag)),
        None => body.ai.as_ref().is_some_and(parse_flag),
    };

    AuditRequest {
        url: body.url.unwrap_or_default(),
        mode,
        use_ai,
        selected_codes: body.codes,
    }
}

// ===== Audit conversions =====

impl From<CriterionResult> for CriterionResultDto {
    fn from(result: CriterionResult) -> Self {
        Self {
            code: result.code,
            title: result.title,
            level: result.level.map(|l| l.as_str().to_string()),
            principle: result.principle.map(|p| p.as_str().to_string()),
            verdict: result.verdict.as_str().to_string(),
            source: result.source.as_str().to_string(),
            score: result.score,
            score_hint: result.score_hint,
            details: result.details,
        }
    }
}

impl From<contract::Audit> for AuditDto {
    fn from(audit: contract::Audit) -> Self {
        Self {
            id: audit.id,
            url: audit.url,
            fetched_at: audit.fetched_at,
            status_code: audit.status_code,
            elapsed_ms: audit.elapsed_ms,
            page_title: audit.page_title,
            score: audit.score,
            results: audit.results,
            raw: audit.raw,
            rendered: audit.rendered,
            ai: audit.ai,
            criterion_results: audit
                .criterion_results
                .into_iter()
                .map(CriterionResultDto::from)
                .collect(),
        }
    }
}

impl From<VerdictCounts> for VerdictCountsDto {
    fn from(counts: VerdictCounts) -> Self {
        Self {
            pass: counts.pass,
            fail: counts.fail,
            partial: counts.partial,
            na: counts.na,
        }
    }
}

impl From<contract::AuditSummary> for AuditSummaryDto {
    fn from(summary: contract::AuditSummary) -> Self {
        Self {
            id: summary.id,
            url: summary.url,
            fetched_at: summary.fetched_at,
            page_title: summary.page_title,
            score: summary.score,
            status_code: summary.status_code,
            elapsed_ms: summary.elapsed_ms,
            rendered: summary.rendered,
            mode_effective: summary.mode_effective.as_str().to_string(),
            verdict_counts: summary.verdict_counts.into(),
            rendered_codes_count: summary.rendered_codes_count,
            ai_codes_count: summary.ai_codes_count,
        }
    }
}

impl From<CriterionInfo> for CriterionInfoDto {
    fn from(info: CriterionInfo) -> Self {
        Self {
            code: info.code.to_string(),
            title: info.title.to_string(),
            level: info.level.as_str().to_string(),
            principle: info.principle.as_str().to_string(),
            implemented: info.implemented,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_overrides_body() {
        let body = AuditCreateRequest {
            url: Some("https://example.org".into()),
            mode: Some("rendered".into()),
            ai: Some(json!(true)),
            codes: None,
        };
        let query = AuditModeQuery {
            mode: Some("auto".into()),
            ai: Some("no".into()),
        };
        let request = audit_request(body, query);
        assert_eq!(request.mode, CheckMode::Auto);
        assert!(!request.use_ai);
    }

    #[test]
    fn body_flags_accept_strings() {
        let body = AuditCreateRequest {
            url: Some("https://example.org".into()),
            mode: None,
            ai: Some(json!("YES")),
            codes: None,
        };
        let request = audit_request(body, AuditModeQuery::default());
        assert_eq!(request.mode, CheckMode::Raw);
        assert!(request.use_ai);
        assert!(parse_flag(&json!(1)));
        assert!(!parse_flag(&json!("0")));
        assert!(!parse_flag(&json!(null)));
    }
}
