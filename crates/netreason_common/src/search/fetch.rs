//! Page fetch transport.

use super::extract::paragraph_text_nodes;
use crate::config::SearchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Raw HTTP response, body already decoded to text
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url`. Non-success statuses are returned, not raised.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;

    /// HEAD `url`. The body is always empty.
    async fn head(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;

    /// Structured crawl for static pages: paragraph-level text nodes only
    async fn crawl_paragraphs(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let page = self.fetch(url, timeout).await?;
        if !page.is_success() {
            return Err(FetchError::Status(page.status));
        }
        paragraph_text_nodes(&page.body)
    }
}

// ============================================================================
// HTTP Fetcher
// ============================================================================

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()
                .unwrap_or_default(),
        }
    }

    fn map_error(e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    }

    fn content_type(resp: &reqwest::Response) -> Option<String> {
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        debug!("GET {} (timeout {:?})", url, timeout);
        let resp = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_error)?;

        let status = resp.status().as_u16();
        let content_type = Self::content_type(&resp);
        let body = resp.text().await.map_err(Self::map_error)?;

        Ok(FetchedPage {
            status,
            content_type,
            body,
        })
    }

    async fn head(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        debug!("HEAD {}", url);
        let resp = self
            .http
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_error)?;

        Ok(FetchedPage {
            status: resp.status().as_u16(),
            content_type: Self::content_type(&resp),
            body: String::new(),
        })
    }
}

// ============================================================================
// Fake Page Fetcher (Testing)
// ============================================================================

#[derive(Default)]
struct FetchCounts {
    fetches: HashMap<String, usize>,
    heads: HashMap<String, usize>,
}

/// Serves canned pages by exact URL. Unknown URLs fail with a network error.
pub struct FakePageFetcher {
    pages: HashMap<String, Result<FetchedPage, FetchError>>,
    counts: Arc<Mutex<FetchCounts>>,
}

impl FakePageFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            counts: Arc::new(Mutex::new(FetchCounts::default())),
        }
    }

    /// 200 text/html page
    pub fn with_html(self, url: &str, html: &str) -> Self {
        self.with_page(
            url,
            FetchedPage {
                status: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: html.to_string(),
            },
        )
    }

    pub fn with_page(mut self, url: &str, page: FetchedPage) -> Self {
        self.pages.insert(url.to_string(), Ok(page));
        self
    }

    pub fn failing(mut self, url: &str, error: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(error));
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts
            .lock()
            .unwrap()
            .fetches
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn head_count(&self, url: &str) -> usize {
        self.counts
            .lock()
            .unwrap()
            .heads
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// GET and HEAD requests across all URLs
    pub fn total_fetches(&self) -> usize {
        let counts = self.counts.lock().unwrap();
        counts.fetches.values().sum::<usize>() + counts.heads.values().sum::<usize>()
    }

    fn lookup(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Network(format!("unreachable: {}", url))))
    }
}

impl Default for FakePageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for FakePageFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        *self
            .counts
            .lock()
            .unwrap()
            .fetches
            .entry(url.to_string())
            .or_insert(0) += 1;
        self.lookup(url)
    }

    async fn head(&self, url: &str, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        *self
            .counts
            .lock()
            .unwrap()
            .heads
            .entry(url.to_string())
            .or_insert(0) += 1;
        self.lookup(url).map(|page| FetchedPage {
            body: String::new(),
            ..page
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_crawl_paragraphs_keeps_direct_text() {
        let fetcher = FakePageFetcher::new().with_html(
            "https://a.example/",
            "<html><body><p>Intro <b>bold</b> tail</p></body></html>",
        );
        let text = fetcher
            .crawl_paragraphs("https://a.example/", TIMEOUT)
            .await
            .unwrap();
        assert_eq!(text, "Intro\ntail");
    }

    #[tokio::test]
    async fn test_crawl_paragraphs_rejects_error_status() {
        let fetcher = FakePageFetcher::new().with_page(
            "https://a.example/",
            FetchedPage {
                status: 503,
                content_type: None,
                body: "<p>down</p>".to_string(),
            },
        );
        let err = fetcher
            .crawl_paragraphs("https://a.example/", TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Status(503));
    }

    #[tokio::test]
    async fn test_fake_counts_and_head_has_no_body() {
        let fetcher = FakePageFetcher::new().with_html("https://a.example/", "<p>x</p>");

        let head = fetcher.head("https://a.example/", TIMEOUT).await.unwrap();
        assert!(head.body.is_empty());
        assert_eq!(head.content_type.as_deref(), Some("text/html; charset=utf-8"));

        fetcher.fetch("https://a.example/", TIMEOUT).await.unwrap();
        assert!(fetcher.fetch("https://b.example/", TIMEOUT).await.is_err());

        assert_eq!(fetcher.head_count("https://a.example/"), 1);
        assert_eq!(fetcher.fetch_count("https://a.example/"), 1);
        assert_eq!(fetcher.total_fetches(), 3);
    }

    #[test]
    fn test_success_range() {
        let mut page = FetchedPage {
            status: 204,
            content_type: None,
            body: String::new(),
        };
        assert!(page.is_success());
        page.status = 301;
        assert!(!page.is_success());
    }
}
