//! Page sources: the static HTML fetcher and the rendered-DOM loader.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = "FisiChecker/1.0 (+ WCAG 2.1 auditor)";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("rendering service returned {status} for {url}")]
    RenderStatus { url: String, status: u16 },

    #[error("rendering service not configured")]
    Unavailable,
}

/// Static fetch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub status_code: u16,
    pub final_url: String,
    pub elapsed_ms: i64,
    pub content_type: String,
}

/// Downloads the static HTML of a page
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Produces the DOM of a page after scripts have run
#[async_trait]
pub trait RenderedLoader: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, FetchError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|source| FetchError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HtmlFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        // Non-2xx pages are still audited; the status is recorded.
        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let html = response.text().await.map_err(http_err)?;

        Ok(FetchedPage {
            html,
            status_code,
            final_url,
            elapsed_ms: started.elapsed().as_millis() as i64,
            content_type,
        })
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    timeout_ms: u64,
}

/// Client for an external rendering service.
///
/// The service receives `POST {endpoint}` with `{"url", "timeout_ms"}` and
/// answers with the serialized DOM as the response body.
pub struct HttpRenderer {
    client: reqwest::Client,
    endpoint: Option<String>,
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new(endpoint: Option<String>, timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        // Leave headroom over the page timeout for the service round trip.
        let client = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .map_err(|source| FetchError::Http {
                url: endpoint.clone().unwrap_or_default(),
                source,
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            timeout,
        })
    }
}

#[async_trait]
impl RenderedLoader for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(FetchError::Unavailable);
        };
        let http_err = |source| FetchError::Http {
            url: endpoint.to_string(),
            source,
        };

        let response = self
            .client
            .post(endpoint)
            .json(&RenderRequest {
                url,
                timeout_ms: self.timeout.as_millis() as u64,
            })
            .send()
            .await
            .map_err(http_err)?;

        if !response.status().is_success() {
            return Err(FetchError::RenderStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().await.map_err(http_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_renderer_reports_unavailable() {
        let renderer = HttpRenderer::new(None, Duration::from_secs(1), DEFAULT_USER_AGENT).unwrap();
        let err = renderer.render("https://example.org").await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable));
    }
}
