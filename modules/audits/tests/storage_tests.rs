//! SeaORM repository and module lifecycle against an in-memory SQLite database

mod common;

use std::sync::Arc;

use audits::contract::{AuditError, Level, NewAudit, Principle, Source, Verdict};
use audits::domain::repository::AuditRepository;
use audits::infra::storage::SeaOrmAuditRepository;
use audits::{AuditsModule, Config};
use chrono::Duration;
use common::{base_time, result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::json;

async fn memory_db() -> Arc<DatabaseConnection> {
    // One connection, otherwise every pooled connection sees its own database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    AuditsModule::default().migrate(&db).await.unwrap();
    Arc::new(db)
}

fn new_audit(url: &str, days_ago: i64) -> NewAudit {
    let mut alt = result("1.1.1", Level::A, Principle::Perceivable, Verdict::Fail, Source::Raw);
    alt.details = json!({"offenders": [{"src": "/logo.png"}], "note": "RAW: missing alt"});
    NewAudit {
        url: url.to_string(),
        fetched_at: base_time() - Duration::days(days_ago),
        status_code: Some(200),
        elapsed_ms: Some(321),
        page_title: Some("Portal".to_string()),
        score: Some(1.0),
        results: json!({"1.1.1": {"verdict": "fail"}, "score_breakdown": {"coverage": 0.5}}),
        raw: true,
        rendered: false,
        ai: false,
        criterion_results: vec![
            alt,
            result("2.4.2", Level::A, Principle::Operable, Verdict::Pass, Source::Raw),
            result("1.4.3", Level::AA, Principle::Perceivable, Verdict::Na, Source::Raw),
        ],
    }
}

#[tokio::test]
async fn create_and_read_back() {
    let repo = SeaOrmAuditRepository::new(memory_db().await);

    let created = repo.create(new_audit("https://www.gob.pe", 0)).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.criterion_results.len(), 3);

    let loaded = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(loaded.url, "https://www.gob.pe");
    assert_eq!(loaded.status_code, Some(200));
    assert_eq!(loaded.fetched_at, base_time());
    assert_eq!(loaded.results["score_breakdown"]["coverage"], json!(0.5));

    let alt = loaded.criterion_results.iter().find(|r| r.code == "1.1.1").unwrap();
    assert_eq!(alt.verdict, Verdict::Fail);
    assert_eq!(alt.score, Some(0));
    assert_eq!(alt.level, Some(Level::A));
    assert_eq!(alt.details["offenders"][0]["src"], json!("/logo.png"));

    let na = loaded.criterion_results.iter().find(|r| r.code == "1.4.3").unwrap();
    assert_eq!(na.score, None);

    assert!(repo.find_by_id(created.id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn list_is_newest_first() {
    let repo = SeaOrmAuditRepository::new(memory_db().await);
    let old = repo.create(new_audit("https://old.gob.pe", 5)).await.unwrap();
    let new = repo.create(new_audit("https://new.gob.pe", 0)).await.unwrap();
    let mid = repo.create(new_audit("https://mid.gob.pe", 2)).await.unwrap();

    let all = repo.list_all().await.unwrap();
    let ids: Vec<i64> = all.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![new.id, mid.id, old.id]);
    assert!(all.iter().all(|a| a.criterion_results.len() == 3));
}

#[tokio::test]
async fn delete_removes_results() {
    let repo = SeaOrmAuditRepository::new(memory_db().await);
    let keep = repo.create(new_audit("https://keep.gob.pe", 1)).await.unwrap();
    let gone = repo.create(new_audit("https://gone.gob.pe", 0)).await.unwrap();

    assert!(repo.delete(gone.id).await.unwrap());
    assert!(!repo.delete(gone.id).await.unwrap());
    assert!(repo.find_by_id(gone.id).await.unwrap().is_none());

    let remaining = repo.find_by_id(keep.id).await.unwrap().unwrap();
    assert_eq!(remaining.criterion_results.len(), 3);
}

#[tokio::test]
async fn module_lifecycle() {
    let db = memory_db().await;
    let module = AuditsModule::default();
    assert!(module.client().is_err());

    let mut cfg = Config::default();
    cfg.ai.enabled = false;
    module.init(cfg, db.clone()).unwrap();
    assert!(!module.config().ai.enabled);

    let client = module.client().unwrap();
    assert!(client.list_audits().await.unwrap().is_empty());
    assert!(matches!(client.get_audit(1).await, Err(AuditError::NotFound { .. })));
    assert!(matches!(client.delete_audit(1).await, Err(AuditError::NotFound { .. })));

    SeaOrmAuditRepository::new(db)
        .create(new_audit("https://www.gob.pe", 0))
        .await
        .unwrap();
    let listed = client.list_audits().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].url, "https://www.gob.pe");

    assert!(module.register_rest(axum::Router::new()).is_ok());
}
