//! Shared fixtures: in-memory repository, canned page sources and sample audits
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use audits::ai::{AiError, AiReviewer, Review, ReviewRequest};
use audits::contract::{
    Audit, CriterionResult, Level, NewAudit, Principle, Source, Verdict,
};
use audits::domain::repository::AuditRepository;
use audits::domain::Service;
use audits::engine::{Auditor, FetchError, FetchedPage, HtmlFetcher, RenderedLoader};
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;
use serde_json::{json, Map};

pub const GOOD_URL: &str = "https://www.gob.pe/minsa";
pub const BAD_URL: &str = "https://legacy.example.pe/";

/// Accessible page: lang, title, alt text, unique ids, labelled form
pub const GOOD_PAGE: &str = r##"<!DOCTYPE html>
<html lang="es">
<head>
  <title>Ministerio de Salud - Inicio</title>
  <meta property="og:site_name" content="Ministerio de Salud">
</head>
<body>
  <a href="#main">Saltar al contenido principal</a>
  <header><nav><a href="/tramites">Trámites y servicios</a></nav></header>
  <main id="main">
    <h1>Bienvenido al portal del Ministerio</h1>
    <img src="/logo.png" alt="Escudo del Ministerio de Salud">
    <img src="/line.png" alt="" role="presentation">
    <form>
      <label for="email">Correo electrónico</label>
      <input id="email" type="email" name="email" autocomplete="email">
      <button type="submit">Enviar consulta</button>
    </form>
  </main>
</body>
</html>"##;

/// Page with the usual problems: no lang, empty title, missing alt, duplicate ids
pub const BAD_PAGE: &str = r#"<html>
<head><title></title></head>
<body>
  <div id="x"><img src="/banner.jpg"></div>
  <div id="x"><img src="/promo.jpg"></div>
  <a href="/more">click here</a>
  <input type="text" name="q">
</body>
</html>"#;

// ===== Page sources =====

/// Serves canned HTML per URL; unknown URLs fail like an unreachable host
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
            .with_page(GOOD_URL, GOOD_PAGE)
            .with_page(BAD_URL, BAD_PAGE)
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl HtmlFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let html = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
        Ok(FetchedPage {
            html,
            status_code: 200,
            final_url: url.to_string(),
            elapsed_ms: 42,
            content_type: "text/html; charset=utf-8".to_string(),
        })
    }
}

/// Rendered DOM equal to a fixed document, or always unavailable
pub struct FakeRenderer {
    html: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn serving(html: &str) -> Self {
        Self {
            html: Some(html.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            html: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RenderedLoader for FakeRenderer {
    async fn render(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.html.clone().ok_or(FetchError::Unavailable)
    }
}

/// Reviewer that always suggests `partial` and records which codes it saw
#[derive(Default)]
pub struct FakeReviewer {
    pub seen: RwLock<Vec<String>>,
    pub fail: bool,
}

impl FakeReviewer {
    pub fn failing() -> Self {
        Self {
            seen: RwLock::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl AiReviewer for FakeReviewer {
    async fn review(&self, request: ReviewRequest<'_>) -> Result<Review, AiError> {
        self.seen.write().push(request.code.to_string());
        if self.fail {
            return Err(AiError::Status(500));
        }
        let mut answer = Map::new();
        answer.insert("verdict".into(), json!("partial"));
        answer.insert("score_0_2".into(), json!(1));
        answer.insert("explanation".into(), json!("Needs a human look."));
        Ok(Review::from_answer(answer))
    }
}

// ===== Repository =====

#[derive(Default)]
struct Store {
    next_id: i64,
    audits: HashMap<i64, Audit>,
}

/// In-memory [`AuditRepository`]
#[derive(Clone, Default)]
pub struct MockAuditRepo {
    store: Arc<RwLock<Store>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockAuditRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated with stored audits
    pub fn with_audits(audits: Vec<Audit>) -> Self {
        let repo = Self::new();
        {
            let mut store = repo.store.write();
            for audit in audits {
                store.next_id = store.next_id.max(audit.id);
                store.audits.insert(audit.id, audit);
            }
        }
        repo
    }

    /// Make every write fail as if the database were down
    pub fn break_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.store.read().audits.len()
    }
}

#[async_trait]
impl AuditRepository for MockAuditRepo {
    async fn create(&self, audit: NewAudit) -> anyhow::Result<Audit> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        let mut store = self.store.write();
        store.next_id += 1;
        let stored = Audit {
            id: store.next_id,
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
            criterion_results: audit.criterion_results,
        };
        store.audits.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Audit>> {
        Ok(self.store.read().audits.get(&id).cloned())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Audit>> {
        let mut audits: Vec<Audit> = self.store.read().audits.values().cloned().collect();
        audits.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at).then(b.id.cmp(&a.id)));
        Ok(audits)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(self.store.write().audits.remove(&id).is_some())
    }
}

// ===== Builders =====

pub fn auditor(renderer: FakeRenderer, reviewer: Option<Arc<dyn AiReviewer>>) -> Auditor {
    Auditor::new(
        Arc::new(FixtureFetcher::new()),
        Arc::new(renderer),
        reviewer,
        2000,
    )
}

pub fn service_with(repo: MockAuditRepo, reviewer: Option<Arc<dyn AiReviewer>>) -> Arc<Service> {
    Arc::new(Service::new(
        Arc::new(repo),
        Arc::new(auditor(FakeRenderer::unavailable(), reviewer)),
    ))
}

pub fn service(repo: MockAuditRepo) -> Arc<Service> {
    service_with(repo, None)
}

pub fn result(code: &str, level: Level, principle: Principle, verdict: Verdict, source: Source) -> CriterionResult {
    CriterionResult {
        code: code.to_string(),
        title: format!("Criterion {code}"),
        level: Some(level),
        principle: Some(principle),
        verdict,
        source,
        score: verdict.score(),
        score_hint: None,
        details: json!({}),
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap()
}

/// Stored audit `days_ago` days before [`base_time`]
pub fn stored_audit(id: i64, url: &str, score: Option<f64>, days_ago: i64, results: Vec<CriterionResult>) -> Audit {
    let rendered = results.iter().any(|r| r.source == Source::Rendered);
    let ai = results.iter().any(|r| r.source == Source::Ai);
    Audit {
        id,
        url: url.to_string(),
        fetched_at: base_time() - Duration::days(days_ago),
        status_code: Some(200),
        elapsed_ms: Some(100),
        page_title: Some(format!("Site {id}")),
        score,
        results: json!({}),
        raw: true,
        rendered,
        ai,
        criterion_results: results,
    }
}

/// Four audits over three URLs with mixed verdicts, levels and sources
pub fn sample_audits() -> Vec<Audit> {
    use Level::*;
    use Principle::*;
    vec![
        stored_audit(1, "https://a.gob.pe", Some(2.0), 0, vec![
            result("1.1.1", A, Perceivable, Verdict::Pass, Source::Raw),
            result("2.4.2", A, Operable, Verdict::Pass, Source::Raw),
            result("1.4.3", AA, Perceivable, Verdict::Pass, Source::Rendered),
        ]),
        stored_audit(2, "https://b.gob.pe", Some(0.5), 1, vec![
            result("1.1.1", A, Perceivable, Verdict::Fail, Source::Raw),
            result("2.4.2", A, Operable, Verdict::Partial, Source::Raw),
            result("1.4.3", AA, Perceivable, Verdict::Fail, Source::Rendered),
            result("4.1.3", AA, Robust, Verdict::Na, Source::Rendered),
        ]),
        stored_audit(3, "https://c.gob.pe", Some(1.0), 1, vec![
            result("1.1.1", A, Perceivable, Verdict::Fail, Source::Ai),
            result("3.1.1", A, Understandable, Verdict::Pass, Source::Raw),
        ]),
        stored_audit(4, "https://a.gob.pe", None, 40, vec![
            result("4.1.3", AA, Robust, Verdict::Na, Source::Mixed),
        ]),
    ]
}
