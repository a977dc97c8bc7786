//! Ollama client, reviewer and page fetchers against a mock HTTP server

use std::time::Duration;

use audits::ai::ollama::ChatMessage;
use audits::ai::{AiError, AiReviewer, OllamaClient, OllamaReviewer, ReviewRequest};
use audits::config::AiConfig;
use audits::contract::Verdict;
use audits::engine::{FetchError, HtmlFetcher, HttpRenderer, RenderedLoader, ReqwestFetcher};
use httpmock::prelude::*;
use serde_json::{json, Map};

fn ai_config(server: &MockServer) -> AiConfig {
    AiConfig {
        host: format!("{}/", server.base_url()),
        model: "llama3.1:latest".to_string(),
        timeout: Duration::from_secs(5),
        max_retries: 2,
        ..AiConfig::default()
    }
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "llama3.1:latest",
        "message": {"role": "assistant", "content": content},
        "done": true
    })
}

// ===== Ollama =====

#[tokio::test]
async fn chat_posts_non_streaming_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_includes("\"stream\":false")
                .body_includes("\"num_predict\":800")
                .body_includes("\"model\":\"llama3.1:latest\"");
            then.status(200).json_body(chat_reply("  hola  "));
        })
        .await;

    let client = OllamaClient::new(&ai_config(&server)).unwrap();
    let text = client.chat(&[ChatMessage::user("hi")]).await.unwrap();

    assert_eq!(text, "hola");
    mock.assert_async().await;
}

#[tokio::test]
async fn chat_reports_http_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(500).body("boom");
        })
        .await;

    let client = OllamaClient::new(&ai_config(&server)).unwrap();
    let err = client.chat(&[ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, AiError::Status(500)));
}

#[tokio::test]
async fn ask_json_extracts_fenced_object() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200)
                .json_body(chat_reply("Sure:\n```json\n{\"verdict\": \"pass\"}\n```"));
        })
        .await;

    let client = OllamaClient::new(&ai_config(&server)).unwrap();
    let answer = client.ask_json("Evaluate", "{}", None).await;
    assert_eq!(answer.get("verdict"), Some(&json!("pass")));
}

#[tokio::test]
async fn ask_json_retries_then_flags_parse_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(chat_reply("I think it is fine."));
        })
        .await;

    let client = OllamaClient::new(&ai_config(&server)).unwrap();
    let answer = client.ask_json("Evaluate", "", Some("system")).await;

    assert_eq!(answer.get("parse_error"), Some(&json!(true)));
    assert_eq!(answer.get("text"), Some(&json!("I think it is fine.")));
    mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn reviewer_normalizes_answer() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_includes("1.1.1");
            then.status(200).json_body(chat_reply(
                "{\"verdict\": \"FAIL\", \"score_0_2\": \"0\", \"explanation\": \"Banner images lack alt.\"}",
            ));
        })
        .await;

    let reviewer = OllamaReviewer::new(OllamaClient::new(&ai_config(&server)).unwrap());
    let details = Map::new();
    let review = reviewer
        .review(ReviewRequest {
            code: "1.1.1",
            verdict: Verdict::Fail,
            details: &details,
            html_snippet: "<img src=\"/banner.jpg\">",
        })
        .await
        .unwrap();

    assert_eq!(review.verdict, Verdict::Fail);
    assert_eq!(review.score_0_2, Some(0));
    assert_eq!(review.explanation, "Banner images lack alt.");
}

#[tokio::test]
async fn reviewer_rejects_unparseable_answers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(chat_reply("no idea"));
        })
        .await;

    let cfg = AiConfig {
        max_retries: 0,
        ..ai_config(&server)
    };
    let reviewer = OllamaReviewer::new(OllamaClient::new(&cfg).unwrap());
    let details = Map::new();
    let err = reviewer
        .review(ReviewRequest {
            code: "3.3.2",
            verdict: Verdict::Partial,
            details: &details,
            html_snippet: "",
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Unparseable(text) if text == "no idea"));
}

// ===== Page sources =====

#[tokio::test]
async fn fetcher_keeps_non_success_pages() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing");
            then.status(404)
                .header("content-type", "text/html")
                .body("<html><title>No encontrado</title></html>");
        })
        .await;

    let fetcher = ReqwestFetcher::new(Duration::from_secs(5), "FisiChecker-test").unwrap();
    let page = fetcher.fetch(&server.url("/missing")).await.unwrap();

    assert_eq!(page.status_code, 404);
    assert!(page.html.contains("No encontrado"));
    assert_eq!(page.content_type, "text/html");
    assert!(page.elapsed_ms >= 0);
}

#[tokio::test]
async fn fetcher_sends_user_agent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/").header("user-agent", "FisiChecker-test");
            then.status(200).body("<html></html>");
        })
        .await;

    let fetcher = ReqwestFetcher::new(Duration::from_secs(5), "FisiChecker-test").unwrap();
    fetcher.fetch(&server.url("/")).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn renderer_posts_url_and_returns_dom() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/render")
                .body_includes("\"url\":\"https://www.gob.pe\"");
            then.status(200).body("<html lang=\"es\"><body>rendered</body></html>");
        })
        .await;

    let renderer = HttpRenderer::new(
        Some(server.url("/render")),
        Duration::from_secs(5),
        "FisiChecker-test",
    )
    .unwrap();
    let html = renderer.render("https://www.gob.pe").await.unwrap();

    assert!(html.contains("rendered"));
    mock.assert_async().await;
}

#[tokio::test]
async fn renderer_error_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/render");
            then.status(502);
        })
        .await;

    let renderer = HttpRenderer::new(Some(server.url("/render")), Duration::from_secs(5), "ua").unwrap();
    let err = renderer.render("https://www.gob.pe").await.unwrap_err();
    assert!(matches!(err, FetchError::RenderStatus { status: 502, .. }));

    let unconfigured = HttpRenderer::new(Some("  ".into()), Duration::from_secs(5), "ua").unwrap();
    assert!(matches!(
        unconfigured.render("https://www.gob.pe").await,
        Err(FetchError::Unavailable)
    ));
}
