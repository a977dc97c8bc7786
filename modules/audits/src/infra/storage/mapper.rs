//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use sea_orm::ActiveValue::{NotSet, Set};

use super::entity;
use crate::contract::{Audit, CriterionResult, Level, NewAudit, Principle, Source, Verdict};

// ===== Criterion Result Conversions =====

impl From<entity::result::Model> for CriterionResult {
    fn from(entity: entity::result::Model) -> Self {
        let verdict = Verdict::parse(&entity.verdict).unwrap_or(Verdict::Na);
        Self {
            code: entity.code,
            title: entity.title,
            level: Level::parse(&entity.level),
            principle: Principle::parse(&entity.principle),
            verdict,
            source: Source::parse(&entity.source).unwrap_or(Source::Raw),
            // Stored score wins, rows written before the column existed fall back to the verdict
            score: entity.score.or_else(|| verdict.score()),
            score_hint: entity.score_hint,
            details: entity.details,
        }
    }
}

/// Active model for one result row of the given audit
pub fn result_active_model(audit_id: i64, result: &CriterionResult) -> entity::result::ActiveModel {
    entity::result::ActiveModel {
        id: NotSet,
        audit_id: Set(audit_id),
        code: Set(result.code.clone()),
        title: Set(result.title.clone()),
        level: Set(result.level.map(|l| l.as_str()).unwrap_or_default().to_string()),
        principle: Set(result
            .principle
            .map(|p| p.as_str())
            .unwrap_or_default()
            .to_string()),
        verdict: Set(result.verdict.as_str().to_string()),
        source: Set(result.source.as_str().to_string()),
        score: Set(result.score),
        score_hint: Set(result.score_hint),
        details: Set(result.details.clone()),
    }
}

// ===== Audit Conversions =====

/// Assemble an audit from its row and its result rows
pub fn audit_from_models(model: entity::Model, results: Vec<entity::result::Model>) -> Audit {
    Audit {
        id: model.id,
        url: model.url,
        fetched_at: model.fetched_at,
        status_code: model.status_code.and_then(|s| u16::try_from(s).ok()),
        elapsed_ms: model.elapsed_ms,
        page_title: model.page_title,
        score: model.score,
        results: model.results,
        raw: model.raw,
        rendered: model.rendered,
        ai: model.ai,
        criterion_results: results.into_iter().map(CriterionResult::from).collect(),
    }
}

impl From<&NewAudit> for entity::ActiveModel {
    fn from(model: &NewAudit) -> Self {
        Self {
            id: NotSet,
            url: Set(model.url.clone()),
            fetched_at: Set(model.fetched_at),
            status_code: Set(model.status_code.map(i32::from)),
            elapsed_ms: Set(model.elapsed_ms),
            page_title: Set(model.page_title.clone()),
            score: Set(model.score),
            results: Set(model.results.clone()),
            raw: Set(model.raw),
            rendered: Set(model.rendered),
            ai: Set(model.ai),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(level: &str, verdict: &str, source: &str, score: Option<i16>) -> entity::result::Model {
        entity::result::Model {
            id: 1,
            audit_id: 1,
            code: "1.1.1".into(),
            title: "Non-text Content".into(),
            level: level.into(),
            principle: "Perceivable".into(),
            verdict: verdict.into(),
            source: source.into(),
            score,
            score_hint: None,
            details: json!({}),
        }
    }

    #[test]
    fn legacy_rows_map_leniently() {
        let result = CriterionResult::from(row("", "partial", "", None));
        assert_eq!(result.level, None);
        assert_eq!(result.source, Source::Raw);
        assert_eq!(result.verdict, Verdict::Partial);
        assert_eq!(result.score, Some(1));

        let result = CriterionResult::from(row("AA", "bogus", "mixed", None));
        assert_eq!(result.level, Some(Level::AA));
        assert_eq!(result.verdict, Verdict::Na);
        assert_eq!(result.source, Source::Mixed);
        assert_eq!(result.score, None);
    }

    #[test]
    fn result_rows_keep_metadata() {
        let result = CriterionResult {
            code: "2.4.2".into(),
            title: "Page Titled".into(),
            level: Some(Level::A),
            principle: Some(Principle::Operable),
            verdict: Verdict::Fail,
            source: Source::Rendered,
            score: Some(0),
            score_hint: Some(0.2),
            details: json!({"note": "empty title"}),
        };
        let active = result_active_model(9, &result);
        assert_eq!(active.audit_id, Set(9));
        assert_eq!(active.level, Set("A".to_string()));
        assert_eq!(active.source, Set("rendered".to_string()));
        assert_eq!(active.score, Set(Some(0)));
    }
}
