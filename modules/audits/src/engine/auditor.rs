//! Audit orchestration.
//!
//! Every selected criterion runs against the static HTML first. The rendered
//! page replaces that outcome when the mode asks for it or the criterion
//! needs it, and the AI reviewer annotates the chosen outcome when requested.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::ai::{AiError, AiReviewer, ReviewRequest};
use crate::contract::{AuditRequest, CheckMode, EffectiveMode, NewAudit, Source, Verdict, VerdictCounts};

use super::context::PageContext;
use super::criteria::{self, Check, Pass};
use super::error::EngineError;
use super::fetcher::{HtmlFetcher, RenderedLoader};
use super::outcome::{normalize_na, CriterionOutcome};
use super::scoring::{audit_score, score_breakdown};
use super::title::display_title;
use super::wcag;

/// Follow-up suggestions attached to a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recommendations {
    /// Not-applicable criteria that need a rendered page
    pub consider_rendered_for: Vec<&'static str>,
    /// AI-helpful criteria that got no AI review; empty unless AI was requested
    pub consider_ai_for: Vec<&'static str>,
}

/// Everything one audit run produced
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub url: String,
    pub status_code: u16,
    pub elapsed_ms: i64,
    pub page_title: String,
    pub lang: String,
    /// Stored audit score (0..2 scale)
    pub score: Option<f64>,
    /// Pass share over A and AA, coverage-penalized
    pub breakdown_score: Option<f64>,
    pub breakdown: Value,
    pub outcomes: Vec<CriterionOutcome>,
    pub rendered_codes: Vec<&'static str>,
    pub ai_codes: Vec<&'static str>,
    pub mode_effective: EffectiveMode,
    pub verdict_counts: VerdictCounts,
    pub recommendations: Recommendations,
}

pub(crate) fn counts_json(counts: &VerdictCounts) -> Value {
    json!({
        "pass": counts.pass,
        "fail": counts.fail,
        "partial": counts.partial,
        "na": counts.na,
    })
}

impl AuditRun {
    pub fn rendered(&self) -> bool {
        !self.rendered_codes.is_empty()
    }

    /// Payload stored in the audit's `results` column
    pub fn results_json(&self) -> Value {
        let wcag: Map<String, Value> = self
            .outcomes
            .iter()
            .map(|o| {
                let entry = json!({
                    "passed": o.passed(),
                    "status": o.verdict.as_str(),
                    "score_0_2": o.score(),
                    "source": o.source.as_str(),
                    "details": Value::Object(o.details.clone()),
                });
                (o.code.to_string(), entry)
            })
            .collect();

        json!({
            "wcag": Value::Object(wcag),
            "score_breakdown": self.breakdown,
            "breakdown_score": self.breakdown_score,
            "mode_effective": self.mode_effective.as_str(),
            "verdict_counts": counts_json(&self.verdict_counts),
            "recommendations": self.recommendations,
            "rendered_codes": self.rendered_codes,
            "ai_codes": self.ai_codes,
            "lang": self.lang,
        })
    }

    /// Row set ready to be persisted
    pub fn to_new_audit(&self) -> NewAudit {
        NewAudit {
            url: self.url.clone(),
            fetched_at: chrono::Utc::now(),
            status_code: Some(self.status_code),
            elapsed_ms: Some(self.elapsed_ms),
            page_title: Some(self.page_title.clone()).filter(|t| !t.is_empty()),
            score: self.score,
            results: self.results_json(),
            raw: true,
            rendered: self.rendered(),
            ai: !self.ai_codes.is_empty(),
            criterion_results: self.outcomes.iter().map(CriterionOutcome::to_result).collect(),
        }
    }
}

/// Runs audits against injected page sources
pub struct Auditor {
    fetcher: Arc<dyn HtmlFetcher>,
    renderer: Arc<dyn RenderedLoader>,
    reviewer: Option<Arc<dyn AiReviewer>>,
    html_snippet_chars: usize,
}

fn should_try_rendered(mode: CheckMode, code: &str) -> bool {
    match mode {
        CheckMode::Rendered | CheckMode::Ai => true,
        CheckMode::Auto => {
            let caps = wcag::caps(code);
            caps.needs_rendered || caps.rendered_better
        }
        CheckMode::Raw => false,
    }
}

fn should_run_ai(request: &AuditRequest, code: &str) -> bool {
    request.mode == CheckMode::Ai || (request.use_ai && wcag::caps(code).ai_helpful)
}

/// Whether the AI stage settled an outcome, either by reviewing it or by
/// deciding it needed no review.
fn reviewer_answered(outcome: &CriterionOutcome) -> bool {
    match outcome.details.get("ai_info") {
        Some(info) => info.get("ai_error").is_none() && info.get("ai_message").is_none(),
        None => false,
    }
}

fn selected_checks(selected: Option<&[String]>) -> Vec<&'static Check> {
    match selected {
        Some(codes) if !codes.is_empty() => {
            let mut seen = BTreeSet::new();
            codes
                .iter()
                .filter(|c| seen.insert(c.as_str()))
                .filter_map(|c| criteria::get_check(c))
                .collect()
        }
        _ => criteria::list_available_codes()
            .into_iter()
            .filter_map(criteria::get_check)
            .collect(),
    }
}

/// Static pass plus the optional rendered pass, per criterion
fn evaluate(
    checks: &[&'static Check],
    mode: CheckMode,
    raw: &PageContext,
    rendered: Result<&PageContext, &str>,
) -> Vec<CriterionOutcome> {
    checks
        .iter()
        .map(|check| {
            let raw_eval = (check.run)(raw, Pass::Raw);
            let mut chosen = CriterionOutcome::from_evaluation(check.code, Source::Raw, raw_eval);
            if should_try_rendered(mode, check.code) {
                match rendered {
                    Ok(ctx) => {
                        let eval = (check.run)(ctx, Pass::Rendered);
                        chosen = CriterionOutcome::from_evaluation(check.code, Source::Rendered, eval);
                    }
                    Err(reason) => {
                        chosen
                            .details
                            .insert("rendered_run_error".into(), Value::String(reason.to_string()));
                    }
                }
            }
            tracing::debug!(
                code = check.code,
                verdict = chosen.verdict.as_str(),
                source = chosen.source.as_str(),
                "criterion evaluated"
            );
            chosen
        })
        .collect()
}

async fn parse_blocking(html: String) -> Result<PageContext, EngineError> {
    tokio::task::spawn_blocking(move || PageContext::parse(&html))
        .await
        .map_err(|e| EngineError::Task(e.to_string()))?
}

impl Auditor {
    pub fn new(
        fetcher: Arc<dyn HtmlFetcher>,
        renderer: Arc<dyn RenderedLoader>,
        reviewer: Option<Arc<dyn AiReviewer>>,
        html_snippet_chars: usize,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            reviewer,
            html_snippet_chars,
        }
    }

    async fn load_rendered(&self, url: &str) -> Result<(PageContext, String), String> {
        let html = self.renderer.render(url).await.map_err(|e| e.to_string())?;
        let ctx = parse_blocking(html.clone()).await.map_err(|e| e.to_string())?;
        Ok((ctx, html))
    }

    /// Fetch, evaluate and score one page.
    ///
    /// Only the static fetch and parsing can fail the run; rendering and AI
    /// problems are recorded in the affected criterion details.
    pub async fn run(&self, request: &AuditRequest) -> Result<AuditRun, EngineError> {
        let url = request.url.trim();
        let mode = request.mode;
        tracing::info!(url, mode = mode.as_str(), use_ai = request.use_ai, "audit started");

        let page = self.fetcher.fetch(url).await?;
        let checks = selected_checks(request.selected_codes.as_deref());

        let preload = matches!(mode, CheckMode::Rendered | CheckMode::Ai)
            || (mode == CheckMode::Auto && request.use_ai);
        let wants_rendered = preload || checks.iter().any(|c| should_try_rendered(mode, c.code));
        let rendered = if wants_rendered {
            let loaded = self.load_rendered(url).await;
            if let Err(reason) = &loaded {
                tracing::warn!(url, %reason, "rendered page unavailable, keeping static outcomes");
            }
            Some(loaded)
        } else {
            None
        };

        let raw_html = page.html;
        let html_for_ai: String = match &rendered {
            Some(Ok((_, html))) => html.chars().take(self.html_snippet_chars).collect(),
            _ => raw_html.chars().take(self.html_snippet_chars).collect(),
        };

        let rendered_ctx = match rendered {
            Some(Ok((ctx, _))) => Some(Ok(ctx)),
            Some(Err(reason)) => Some(Err(reason)),
            None => None,
        };
        let (raw_ctx, mut outcomes) = tokio::task::spawn_blocking(move || {
            let raw_ctx = PageContext::parse(&raw_html)?;
            let rendered = match &rendered_ctx {
                Some(Ok(ctx)) => Ok(ctx),
                Some(Err(reason)) => Err(reason.as_str()),
                None => Err("rendered page not requested"),
            };
            let outcomes = evaluate(&checks, mode, &raw_ctx, rendered);
            Ok::<_, EngineError>((raw_ctx, outcomes))
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))??;

        for outcome in &mut outcomes {
            if should_run_ai(request, outcome.code) {
                self.review(outcome, &html_for_ai).await;
            }
        }
        let outcomes: Vec<CriterionOutcome> = outcomes.into_iter().map(normalize_na).collect();

        let run = Self::summarize(request, url, page.status_code, page.elapsed_ms, &raw_ctx, outcomes);
        tracing::info!(
            url,
            score = ?run.score,
            mode_effective = run.mode_effective.as_str(),
            criteria = run.outcomes.len(),
            "audit finished"
        );
        Ok(run)
    }

    /// Attach the reviewer's opinion to an outcome.
    ///
    /// The heuristic verdict is kept; only failing or partial outcomes are
    /// sent to the model. The outcome is attributed to the AI stage even when
    /// no reviewer answered, with `ai_info` saying why.
    async fn review(&self, outcome: &mut CriterionOutcome, html_snippet: &str) {
        outcome.source = Source::Ai;
        let Some(reviewer) = &self.reviewer else {
            outcome.details.insert(
                "ai_info".into(),
                json!({
                    "ai_used": false,
                    "ai_message": AiError::NotConfigured.to_string(),
                    "manual_required": false,
                }),
            );
            return;
        };

        if !matches!(outcome.verdict, Verdict::Fail | Verdict::Partial) {
            outcome.details.insert("ai_info".into(), json!({ "ai_used": false }));
            return;
        }

        let request = ReviewRequest {
            code: outcome.code,
            verdict: outcome.verdict,
            details: &outcome.details,
            html_snippet,
        };
        let info = match reviewer.review(request).await {
            Ok(review) => review.to_info(),
            Err(e) => {
                tracing::warn!(code = outcome.code, error = %e, "AI review failed");
                json!({ "ai_used": false, "ai_error": e.to_string(), "manual_required": false })
            }
        };
        outcome.details.insert("ai_info".into(), info);
    }

    fn summarize(
        request: &AuditRequest,
        url: &str,
        status_code: u16,
        elapsed_ms: i64,
        ctx: &PageContext,
        outcomes: Vec<CriterionOutcome>,
    ) -> AuditRun {
        let score = audit_score(outcomes.iter().map(|o| o.verdict));
        let (breakdown_score, breakdown) = score_breakdown(&outcomes);

        let ai_requested = request.use_ai || request.mode == CheckMode::Ai;
        let mut consider_rendered = BTreeSet::new();
        let mut consider_ai = BTreeSet::new();
        for o in &outcomes {
            let caps = wcag::caps(o.code);
            if o.verdict == Verdict::Na && caps.needs_rendered {
                consider_rendered.insert(o.code);
            }
            if ai_requested && caps.ai_helpful && !reviewer_answered(o) {
                consider_ai.insert(o.code);
            }
        }

        let codes_from = |source: Source| -> Vec<&'static str> {
            outcomes.iter().filter(|o| o.source == source).map(|o| o.code).collect()
        };
        let rendered_codes = codes_from(Source::Rendered);
        let ai_codes = codes_from(Source::Ai);

        AuditRun {
            url: url.to_string(),
            status_code,
            elapsed_ms,
            page_title: display_title(url, ctx.site_name_meta.as_deref()),
            lang: ctx.lang.clone(),
            score,
            breakdown_score,
            breakdown,
            rendered_codes,
            ai_codes,
            mode_effective: EffectiveMode::from_sources(outcomes.iter().map(|o| o.source)),
            verdict_counts: VerdictCounts::from_verdicts(outcomes.iter().map(|o| o.verdict)),
            recommendations: Recommendations {
                consider_rendered_for: consider_rendered.into_iter().collect(),
                consider_ai_for: consider_ai.into_iter().collect(),
            },
            outcomes,
        }
    }
}
