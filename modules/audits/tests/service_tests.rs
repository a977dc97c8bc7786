//! Domain service tests with the in-memory repository

mod common;

use audits::contract::{AuditError, AuditRequest, CheckMode, EffectiveMode};
use common::*;

#[tokio::test]
async fn run_audit_persists_and_reads_back() {
    let repo = MockAuditRepo::new();
    let service = service(repo.clone());

    let created = service
        .run_audit(AuditRequest::new(format!("  {GOOD_URL}  "), CheckMode::Raw))
        .await
        .unwrap();
    assert_eq!(created.url, GOOD_URL);
    assert_eq!(created.status_code, Some(200));
    assert_eq!(created.page_title.as_deref(), Some("Ministerio de Salud"));
    assert!(created.score.is_some());
    assert!(!created.criterion_results.is_empty());
    assert_eq!(repo.count(), 1);

    let fetched = service.get_audit(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.results["mode_effective"], "RAW");
}

#[tokio::test]
async fn invalid_urls_are_rejected_before_fetching() {
    let service = service(MockAuditRepo::new());
    for url in ["", "   ", "ftp://files.example.pe", "gob.pe"] {
        let err = service
            .run_audit(AuditRequest::new(url, CheckMode::Raw))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Validation { .. }), "{url}: {err}");
    }
}

#[tokio::test]
async fn fetch_failure_maps_to_fetch_error() {
    let repo = MockAuditRepo::new();
    let service = service(repo.clone());
    let err = service
        .run_audit(AuditRequest::new("https://unknown.example.pe", CheckMode::Raw))
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::Fetch { .. }));
    assert_eq!(repo.count(), 0);
}

#[tokio::test]
async fn storage_failure_maps_to_unavailable() {
    let repo = MockAuditRepo::new();
    repo.break_writes();
    let service = service(repo);
    let err = service
        .run_audit(AuditRequest::new(GOOD_URL, CheckMode::Raw))
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::Unavailable { .. }));
}

#[tokio::test]
async fn list_is_newest_first_with_summaries() {
    let service = service(MockAuditRepo::with_audits(sample_audits()));
    let list = service.list_audits().await.unwrap();

    let ids: Vec<i64> = list.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 3, 2, 4]);

    let second = list.iter().find(|a| a.id == 2).unwrap();
    assert_eq!(second.verdict_counts.fail, 2);
    assert_eq!(second.verdict_counts.na, 1);
    assert_eq!(second.rendered_codes_count, 2);
    assert_eq!(second.mode_effective, EffectiveMode::Rendered);

    let third = list.iter().find(|a| a.id == 3).unwrap();
    assert_eq!(third.mode_effective, EffectiveMode::Ai);
    assert_eq!(third.ai_codes_count, 1);
}

#[tokio::test]
async fn delete_then_not_found() {
    let service = service(MockAuditRepo::with_audits(sample_audits()));
    service.delete_audit(2).await.unwrap();

    assert!(matches!(service.get_audit(2).await, Err(AuditError::NotFound { .. })));
    assert!(matches!(service.delete_audit(2).await, Err(AuditError::NotFound { .. })));
    assert_eq!(service.list_audits().await.unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_audit_statistics_is_not_found() {
    let service = service(MockAuditRepo::new());
    assert!(matches!(
        service.audit_statistics(99).await,
        Err(AuditError::NotFound { .. })
    ));
    assert!(matches!(
        service.audit_detail_statistics(99).await,
        Err(AuditError::NotFound { .. })
    ));
}

#[tokio::test]
async fn catalogue_marks_implemented_criteria() {
    let service = service(MockAuditRepo::new());
    let catalogue = service.catalogue();
    assert_eq!(catalogue.len(), 78);
    let implemented: Vec<_> = catalogue.iter().filter(|c| c.implemented).map(|c| c.code).collect();
    assert_eq!(implemented.len(), 78);
    assert!(implemented.contains(&"1.2.1"));
    assert!(implemented.contains(&"3.1.5"));
}

#[tokio::test]
async fn csv_export_covers_every_result() {
    let service = service(MockAuditRepo::with_audits(sample_audits()));
    let bytes = service.export_csv().await.unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with('\u{feff}'));
    let detail_rows = text
        .lines()
        .skip_while(|l| !l.contains("=== WCAG CRITERIA DETAILS ==="))
        .skip(2)
        .filter(|l| !l.is_empty())
        .count();
    assert_eq!(detail_rows, 10);
}
