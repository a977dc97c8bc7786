//! HTTP-level tests driving the router in process

mod common;

use audits::api::rest::register_routes;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(repo: MockAuditRepo) -> Router {
    register_routes(Router::new(), service(repo))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn create_then_fetch_audit() {
    let app = app(MockAuditRepo::new());
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/audit/",
        Some(json!({"url": GOOD_URL, "mode": "raw", "codes": ["2.4.2", "3.1.1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    for key in ["id", "url", "score", "status_code", "results", "fetched_at"] {
        assert!(created.get(key).is_some(), "missing {key}");
    }
    assert_eq!(created["status_code"], 200);
    assert_eq!(created["score"], 2.0);

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = send(&app, Method::GET, &format!("/api/audits/{id}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    for key in ["id", "url", "score", "status_code", "results", "fetched_at"] {
        assert_eq!(fetched[key], created[key], "{key}");
    }
    assert_eq!(fetched["criterion_results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn query_parameters_override_body() {
    let app = app(MockAuditRepo::new());
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/audit?mode=rendered",
        Some(json!({"url": GOOD_URL, "mode": "raw", "codes": ["2.4.2"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let details = &created["criterion_results"][0]["details"];
    assert!(details.get("rendered_run_error").is_some());
}

#[tokio::test]
async fn bad_submissions_are_problems() {
    let app = app(MockAuditRepo::new());

    let (status, problem) = send(&app, Method::POST, "/api/audit/", Some(json!({"mode": "raw"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["status"], 400);
    assert_eq!(problem["title"], "Validation Error");

    let (status, _) = send(&app, Method::POST, "/api/audit/", Some(json!({"url": "mailto:a@b.pe"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/api/audit/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, problem) = send(
        &app,
        Method::POST,
        "/api/audit/",
        Some(json!({"url": "https://down.example.pe"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["title"], "Audit Failed");
}

#[tokio::test]
async fn storage_outage_is_service_unavailable() {
    let repo = MockAuditRepo::new();
    repo.break_writes();
    let app = app(repo);
    let (status, problem) = send(&app, Method::POST, "/api/audit/", Some(json!({"url": GOOD_URL}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(problem["status"], 503);
}

#[tokio::test]
async fn list_and_not_found() {
    let app = app(MockAuditRepo::with_audits(sample_audits()));

    let (status, list) = send(&app, Method::GET, "/api/audits", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 4);
    assert_eq!(list[0]["id"], 1);
    assert_eq!(list[0]["mode_effective"], "RENDERED");
    assert_eq!(list[0]["verdict_counts"]["pass"], 3);

    let (status, problem) = send(&app, Method::GET, "/api/audits/999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["status"], 404);

    let (status, _) = send(&app, Method::GET, "/api/statistics/audit/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_ids_are_problems() {
    let app = app(MockAuditRepo::with_audits(sample_audits()));
    for (method, uri) in [
        (Method::GET, "/api/audits/abc/"),
        (Method::DELETE, "/api/audits/abc/delete"),
        (Method::GET, "/api/audits/1x/statistics/"),
        (Method::GET, "/api/statistics/audit/abc"),
    ] {
        let (status, problem) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(problem["status"], 400, "{uri}");
        assert_eq!(problem["title"], "Validation Error", "{uri}");
    }
}

#[tokio::test]
async fn delete_routes() {
    let app = app(MockAuditRepo::with_audits(sample_audits()));

    let (status, body) = send(&app, Method::DELETE, "/api/audits/1/delete/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["detail"].as_str().unwrap().contains('1'));

    let (status, _) = send(&app, Method::DELETE, "/api/audits/1/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/api/audits/2", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn statistics_endpoints_respond() {
    let app = app(MockAuditRepo::with_audits(sample_audits()));
    for uri in [
        "/api/statistics/global/",
        "/api/statistics/verdicts/",
        "/api/statistics/criteria/",
        "/api/statistics/levels/",
        "/api/statistics/principles/",
        "/api/statistics/timeline/",
        "/api/statistics/ranking/",
        "/api/statistics/sources/",
        "/api/statistics/audit/1/",
        "/api/statistics/report/",
        "/api/statistics/accessibility-levels/",
        "/api/statistics/accessibility-by-wcag/",
        "/api/audits/1/statistics/",
        "/api/statistics/global",
    ] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(!body.is_null(), "{uri}");
    }
}

#[tokio::test]
async fn count_parameters_are_validated() {
    let app = app(MockAuditRepo::with_audits(sample_audits()));

    let (status, timeline) = send(&app, Method::GET, "/api/statistics/timeline/?days=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline.as_array().unwrap().len(), 1);

    let (status, ranking) = send(&app, Method::GET, "/api/statistics/ranking?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ranking["best_urls"].as_array().unwrap().len(), 1);
    assert_eq!(ranking["worst_urls"][0]["score"], 0.5);

    let (status, _) = send(&app, Method::GET, "/api/statistics/timeline/?days=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::GET, "/api/statistics/ranking/?limit=-3", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_criteria_and_export() {
    let app = app(MockAuditRepo::with_audits(sample_audits()));

    let (status, health) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let (status, criteria) = send(&app, Method::GET, "/api/criteria/", None).await;
    assert_eq!(status, StatusCode::OK);
    let criteria = criteria.as_array().unwrap();
    assert_eq!(criteria.len(), 78);
    assert_eq!(criteria[0]["code"], "1.1.1");
    assert_eq!(criteria[0]["implemented"], true);

    let response = app
        .clone()
        .oneshot(Request::get("/api/export/csv").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with("\u{feff}".as_bytes()));
}
