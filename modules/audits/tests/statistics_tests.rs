//! Statistics over a fixed set of stored audits

mod common;

use audits::domain::statistics::AccessibilityClass;
use common::*;

fn service() -> std::sync::Arc<audits::domain::Service> {
    common::service(MockAuditRepo::with_audits(sample_audits()))
}

#[tokio::test]
async fn global_statistics() {
    let stats = service().global_statistics().await.unwrap();
    assert_eq!(stats.total_audits, 4);
    assert_eq!(stats.average_score, 1.17);
    assert_eq!(stats.total_unique_urls, 3);
    assert_eq!(stats.audits_with_render, 2);
    assert_eq!(stats.audits_with_ai, 1);
}

#[tokio::test]
async fn verdict_distribution_sums_to_hundred() {
    let dist = service().verdict_distribution().await.unwrap();
    assert_eq!(dist.total_results, 10);
    assert_eq!(dist.distribution["pass"].count, 4);
    assert_eq!(dist.distribution["fail"].percentage, 30.0);
    assert_eq!(dist.distribution["partial"].percentage, 10.0);
    assert_eq!(dist.distribution["na"].percentage, 20.0);
    let total: f64 = dist.distribution.values().map(|s| s.percentage).sum();
    assert!((total - 100.0).abs() < 0.05);
}

#[tokio::test]
async fn verdict_distribution_of_empty_store() {
    let dist = common::service(MockAuditRepo::new())
        .verdict_distribution()
        .await
        .unwrap();
    assert_eq!(dist.total_results, 0);
    assert!(dist.distribution.is_empty());
}

#[tokio::test]
async fn criteria_sorted_by_fail_count() {
    let stats = service().criteria_statistics().await.unwrap();
    let codes: Vec<&str> = stats.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["1.1.1", "1.4.3", "2.4.2", "3.1.1", "4.1.3"]);
    assert!(stats.windows(2).all(|w| w[0].fail_count >= w[1].fail_count));

    let alt = &stats[0];
    assert_eq!(alt.total_checks, 3);
    assert_eq!(alt.fail_count, 2);
    assert_eq!(alt.average_score, 0.67);
    assert_eq!(alt.fail_rate, 66.67);
    assert_eq!(alt.level, "A");
    assert_eq!(alt.principle, "Perceivable");

    let status = stats.iter().find(|c| c.code == "4.1.3").unwrap();
    assert_eq!(status.na_count, 2);
    assert_eq!(status.average_score, 0.0);
}

#[tokio::test]
async fn criteria_ties_follow_wcag_order() {
    use audits::contract::{Level::*, Principle::*, Source, Verdict};
    let audits = vec![stored_audit(1, "https://a.gob.pe", Some(1.0), 0, vec![
        result("1.4.10", AA, Perceivable, Verdict::Pass, Source::Raw),
        result("2.4.2", A, Operable, Verdict::Fail, Source::Raw),
        result("1.4.2", A, Perceivable, Verdict::Pass, Source::Raw),
        result("1.1.1", A, Perceivable, Verdict::Partial, Source::Raw),
    ])];
    let stats = common::service(MockAuditRepo::with_audits(audits)).criteria_statistics().await.unwrap();
    let codes: Vec<&str> = stats.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["2.4.2", "1.1.1", "1.4.2", "1.4.10"]);
}

#[tokio::test]
async fn level_and_principle_groups() {
    let svc = service();
    let levels = svc.level_statistics().await.unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels["A"].total_checks, 6);
    assert_eq!(levels["A"].pass_count, 3);
    assert_eq!(levels["A"].pass_rate, 50.0);
    assert_eq!(levels["AA"].na_count, 2);
    assert_eq!(levels["AA"].average_score, 1.0);

    let principles = svc.principle_statistics().await.unwrap();
    assert_eq!(principles["Perceivable"].total_checks, 5);
    assert_eq!(principles["Robust"].total_checks, 2);
    assert_eq!(principles["Understandable"].pass_rate, 100.0);
}

#[tokio::test]
async fn timeline_is_ordered_and_limited() {
    let svc = service();
    let all = svc.timeline(30).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].date < w[1].date));
    assert_eq!(all[1].audits_count, 2);
    assert_eq!(all[1].average_score, 0.75);
    assert_eq!(all[0].average_score, 0.0);

    let two = svc.timeline(2).await.unwrap();
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].date, all[0].date);
    assert!(svc.timeline(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn ranking_orders_best_and_worst() {
    let ranking = service().ranking(2).await.unwrap();
    let best: Vec<f64> = ranking.best_urls.iter().map(|e| e.score).collect();
    let worst: Vec<f64> = ranking.worst_urls.iter().map(|e| e.score).collect();
    assert_eq!(best, vec![2.0, 1.0]);
    assert_eq!(worst, vec![0.5, 1.0]);
    assert_eq!(ranking.best_urls[0].url, "https://a.gob.pe");

    let wide = service().ranking(10).await.unwrap();
    assert_eq!(wide.best_urls.len(), 3, "audits without score are not ranked");
}

#[tokio::test]
async fn source_comparison() {
    let sources = service().source_comparison().await.unwrap();
    assert_eq!(sources["raw"].total_checks, 5);
    assert_eq!(sources["raw"].pass_count, 3);
    assert_eq!(sources["rendered"].total_checks, 3);
    assert_eq!(sources["ai"].fail_count, 1);
    assert_eq!(sources["mixed"].total_checks, 1);
}

#[tokio::test]
async fn per_audit_statistics() {
    let svc = service();
    let stats = svc.audit_statistics(1).await.unwrap();
    assert_eq!(stats.overall_score, Some(100.0));
    assert_eq!(stats.level_stats["AA"].pass_count, 1);
    assert_eq!(stats.principle_stats["Operable"].total_checks, 1);

    let detail = svc.audit_detail_statistics(2).await.unwrap();
    assert_eq!(detail.total_criteria_checked, 4);
    assert_eq!(detail.verdict_distribution["fail"].percentage, 50.0);
    assert_eq!(detail.level_distribution["A"], 2);
    assert_eq!(detail.level_distribution["AA"], 2);
    assert_eq!(detail.principle_distribution["Robust"], 1);
}

#[tokio::test]
async fn report_aggregates_everything() {
    let report = service().report().await.unwrap();
    assert_eq!(report.global_statistics.total_audits, 4);
    assert_eq!(report.verdict_distribution.total_results, 10);
    assert_eq!(report.top_failing_criteria[0].code, "1.1.1");
    assert_eq!(report.url_ranking.best_urls.len(), 3);
    assert!(report.source_comparison.contains_key("ai"));
}

#[tokio::test]
async fn accessibility_levels_classify_audits() {
    let levels = service().accessibility_levels().await.unwrap();
    assert_eq!(levels.total_audits_evaluated, 3, "all-NA audits are skipped");
    assert_eq!(levels.average_accessibility_percentage, 54.17);
    assert_eq!(levels.summary["alto"], 1);
    assert_eq!(levels.summary["moderado"], 1);
    assert_eq!(levels.summary["deficiente"], 0);
    assert_eq!(levels.summary["muy_deficiente"], 1);
    assert_eq!(levels.distribution["alto"].percentage, 33.33);

    let details = levels.details.unwrap();
    let ids: Vec<i64> = details.iter().map(|d| d.audit_id).collect();
    assert_eq!(ids, vec![1, 3, 2]);
    let worst = &details[2];
    assert_eq!(worst.coverage, 0.75);
    assert_eq!(worst.base_percentage, 16.67);
    assert_eq!(worst.percentage, 12.5);
    assert_eq!(worst.level, AccessibilityClass::MuyDeficiente);
}

#[tokio::test]
async fn accessibility_by_wcag_level() {
    let by_level = service().accessibility_by_wcag_level().await.unwrap();
    let a = &by_level.by_wcag_level["A"];
    assert_eq!(a.total_audits_evaluated, 3);
    assert_eq!(a.average_accessibility_percentage, 58.33);
    assert!(a.details.is_none());
    assert_eq!(by_level.by_wcag_level["AA"].average_accessibility_percentage, 50.0);
    assert_eq!(by_level.by_wcag_level["AAA"].total_audits_evaluated, 0);
    assert_eq!(by_level.average_across_levels, 36.11);
}
