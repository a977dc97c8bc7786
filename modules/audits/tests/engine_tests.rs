//! Orchestrator tests against fixture pages

mod common;

use std::sync::Arc;

use audits::ai::AiReviewer;
use audits::contract::{AuditRequest, CheckMode, EffectiveMode, Source, Verdict};
use audits::engine::{AuditRun, EngineError};
use common::*;

fn outcome<'a>(run: &'a AuditRun, code: &str) -> &'a audits::engine::CriterionOutcome {
    run.outcomes
        .iter()
        .find(|o| o.code == code)
        .unwrap_or_else(|| panic!("no outcome for {code}"))
}

fn only(codes: &[&str], request: AuditRequest) -> AuditRequest {
    AuditRequest {
        selected_codes: Some(codes.iter().map(|c| c.to_string()).collect()),
        ..request
    }
}

#[tokio::test]
async fn raw_audit_of_accessible_page() {
    let auditor = auditor(FakeRenderer::unavailable(), None);
    let run = auditor
        .run(&AuditRequest::new(GOOD_URL, CheckMode::Raw))
        .await
        .unwrap();

    assert_eq!(run.status_code, 200);
    assert_eq!(run.page_title, "Ministerio de Salud");
    assert_eq!(run.lang, "es");
    for code in ["1.1.1", "2.4.2", "3.1.1", "4.1.1"] {
        let o = outcome(&run, code);
        assert_eq!(o.verdict, Verdict::Pass, "{code}: {:?}", o.details);
        assert_eq!(o.source, Source::Raw);
    }
    assert_eq!(run.mode_effective, EffectiveMode::Raw);
    assert!(!run.rendered());
    assert!(run.ai_codes.is_empty());
    assert_eq!(run.outcomes.len(), audits::engine::criteria::list_available_codes().len());
}

#[tokio::test]
async fn raw_audit_of_broken_page() {
    let auditor = auditor(FakeRenderer::unavailable(), None);
    let request = only(&["1.1.1", "2.4.2", "3.1.1", "4.1.1"], AuditRequest::new(BAD_URL, CheckMode::Raw));
    let run = auditor.run(&request).await.unwrap();

    let codes: Vec<_> = run.outcomes.iter().map(|o| o.code).collect();
    assert_eq!(codes, vec!["1.1.1", "2.4.2", "3.1.1", "4.1.1"]);
    for o in &run.outcomes {
        assert_eq!(o.verdict, Verdict::Fail, "{}: {:?}", o.code, o.details);
    }
    assert_eq!(run.score, Some(0.0));
    assert_eq!(run.verdict_counts.fail, 4);
    assert_eq!(outcome(&run, "4.1.1").details["duplicate_ids"], serde_json::json!(["x"]));
}

#[tokio::test]
async fn na_results_carry_the_flag_and_no_score() {
    let auditor = auditor(FakeRenderer::unavailable(), None);
    let run = auditor
        .run(&AuditRequest::new(GOOD_URL, CheckMode::Raw))
        .await
        .unwrap();

    let na: Vec<_> = run.outcomes.iter().filter(|o| o.verdict == Verdict::Na).collect();
    assert!(!na.is_empty());
    for o in na {
        assert_eq!(o.details.get("na"), Some(&serde_json::Value::Bool(true)), "{}", o.code);
        assert_eq!(o.score(), None);
        assert_eq!(o.score_hint, None);
    }
}

#[tokio::test]
async fn rendered_mode_without_renderer_keeps_static_outcomes() {
    let auditor = auditor(FakeRenderer::unavailable(), None);
    let request = only(&["2.4.2", "3.1.1"], AuditRequest::new(GOOD_URL, CheckMode::Rendered));
    let run = auditor.run(&request).await.unwrap();

    for o in &run.outcomes {
        assert_eq!(o.source, Source::Raw);
        assert_eq!(o.verdict, Verdict::Pass);
        assert!(o.details.contains_key("rendered_run_error"), "{}", o.code);
    }
    assert_eq!(run.mode_effective, EffectiveMode::Raw);
}

#[tokio::test]
async fn rendered_mode_uses_rendered_dom() {
    // The rendered DOM fixes what the static HTML lacks
    let auditor = auditor(FakeRenderer::serving(GOOD_PAGE), None);
    let request = only(&["2.4.2", "3.1.1"], AuditRequest::new(BAD_URL, CheckMode::Rendered));
    let run = auditor.run(&request).await.unwrap();

    for o in &run.outcomes {
        assert_eq!(o.source, Source::Rendered);
        assert_eq!(o.verdict, Verdict::Pass);
    }
    assert_eq!(run.mode_effective, EffectiveMode::Rendered);
    assert_eq!(run.rendered_codes, vec!["2.4.2", "3.1.1"]);
    assert!(run.rendered());
}

#[tokio::test]
async fn auto_mode_renders_only_where_it_helps() {
    let auditor = auditor(FakeRenderer::serving(GOOD_PAGE), None);
    let request = only(&["3.1.1", "4.1.2"], AuditRequest::new(BAD_URL, CheckMode::Auto));
    let run = auditor.run(&request).await.unwrap();

    assert_eq!(outcome(&run, "3.1.1").source, Source::Raw);
    assert_eq!(outcome(&run, "3.1.1").verdict, Verdict::Fail);
    assert_eq!(outcome(&run, "4.1.2").source, Source::Rendered);
}

#[tokio::test]
async fn ai_mode_without_reviewer_is_attributed_to_ai() {
    let auditor = auditor(FakeRenderer::unavailable(), None);
    let request = only(&["1.1.1"], AuditRequest::new(BAD_URL, CheckMode::Ai));
    let run = auditor.run(&request).await.unwrap();

    let o = outcome(&run, "1.1.1");
    assert_eq!(o.verdict, Verdict::Fail);
    assert_eq!(o.source, Source::Ai);
    assert_eq!(o.details["ai_info"]["ai_used"], false);
    assert_eq!(o.details["ai_info"]["manual_required"], false);
    assert!(o.details["ai_info"]["ai_message"].as_str().unwrap().contains("not configured"));
    assert_eq!(run.mode_effective, EffectiveMode::Ai);
}

#[tokio::test]
async fn ai_helper_reviews_failing_helpful_criteria() {
    let reviewer = Arc::new(FakeReviewer::default());
    let auditor = auditor(
        FakeRenderer::unavailable(),
        Some(reviewer.clone() as Arc<dyn AiReviewer>),
    );
    let request = only(
        &["1.1.1", "4.1.1"],
        AuditRequest::new(BAD_URL, CheckMode::Raw).with_ai(true),
    );
    let run = auditor.run(&request).await.unwrap();

    // 4.1.1 is not AI-helpful so only 1.1.1 reaches the model
    assert_eq!(*reviewer.seen.read(), vec!["1.1.1".to_string()]);

    let alt = outcome(&run, "1.1.1");
    assert_eq!(alt.source, Source::Ai);
    assert_eq!(alt.verdict, Verdict::Fail, "the heuristic verdict is kept");
    assert_eq!(alt.details["ai_info"]["ai_used"], true);
    assert_eq!(alt.details["ai_info"]["suggested_verdict"], "partial");
    assert_eq!(outcome(&run, "4.1.1").source, Source::Raw);
    assert_eq!(run.mode_effective, EffectiveMode::Ai);
    assert_eq!(run.ai_codes, vec!["1.1.1"]);
}

#[tokio::test]
async fn ai_review_skipped_for_passing_outcomes() {
    let reviewer = Arc::new(FakeReviewer::default());
    let auditor = auditor(
        FakeRenderer::unavailable(),
        Some(reviewer.clone() as Arc<dyn AiReviewer>),
    );
    let request = only(&["1.1.1"], AuditRequest::new(GOOD_URL, CheckMode::Raw).with_ai(true));
    let run = auditor.run(&request).await.unwrap();

    assert!(reviewer.seen.read().is_empty());
    let o = outcome(&run, "1.1.1");
    assert_eq!(o.verdict, Verdict::Pass);
    assert_eq!(o.details["ai_info"]["ai_used"], false);
}

#[tokio::test]
async fn reviewer_failure_keeps_outcome() {
    let reviewer: Arc<dyn AiReviewer> = Arc::new(FakeReviewer::failing());
    let auditor = auditor(FakeRenderer::unavailable(), Some(reviewer));
    let request = only(&["1.1.1"], AuditRequest::new(BAD_URL, CheckMode::Raw).with_ai(true));
    let run = auditor.run(&request).await.unwrap();

    let o = outcome(&run, "1.1.1");
    assert_eq!(o.source, Source::Ai);
    assert_eq!(o.verdict, Verdict::Fail);
    assert_eq!(o.details["ai_info"]["ai_used"], false);
    assert!(o.details["ai_info"]["ai_error"].is_string());
    assert_eq!(run.recommendations.consider_ai_for, vec!["1.1.1"]);
}

#[tokio::test]
async fn unreachable_page_fails_the_run() {
    let auditor = auditor(FakeRenderer::unavailable(), None);
    let err = auditor
        .run(&AuditRequest::new("https://nowhere.example", CheckMode::Raw))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Fetch(_)));
}

#[tokio::test]
async fn results_payload_shape() {
    let auditor = auditor(FakeRenderer::unavailable(), None);
    let request = only(&["2.4.2", "4.1.3"], AuditRequest::new(GOOD_URL, CheckMode::Raw));
    let run = auditor.run(&request).await.unwrap();
    let results = run.results_json();

    assert_eq!(results["wcag"]["2.4.2"]["status"], "pass");
    assert_eq!(results["wcag"]["2.4.2"]["score_0_2"], 2);
    assert_eq!(results["wcag"]["4.1.3"]["status"], "na");
    assert!(results["wcag"]["4.1.3"]["score_0_2"].is_null());
    assert_eq!(results["mode_effective"], "RAW");
    assert_eq!(results["verdict_counts"]["pass"], 1);
    assert_eq!(results["verdict_counts"]["na"], 1);
    assert_eq!(results["recommendations"]["consider_rendered_for"], serde_json::json!(["4.1.3"]));

    let new_audit = run.to_new_audit();
    assert!(new_audit.raw);
    assert!(!new_audit.rendered);
    assert_eq!(new_audit.score, Some(2.0 * 0.5));
    assert_eq!(new_audit.criterion_results.len(), 2);
}
