//! Search providers.
//!
//! `DuckDuckGoProvider` scrapes the DuckDuckGo HTML endpoint (no API key).
//! `FakeSearchProvider` returns canned results and counts calls.

use super::SearchResult;
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

pub const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Ordered web search
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `max_results` results in provider order
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError>;
}

// ============================================================================
// DuckDuckGo
// ============================================================================

pub struct DuckDuckGoProvider {
    http: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoProvider {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.search_timeout_secs))
                .user_agent(config.user_agent.as_str())
                .build()
                .unwrap_or_default(),
            endpoint: DUCKDUCKGO_HTML_ENDPOINT.to_string(),
        }
    }

    /// Point at a different endpoint (mirrors, local test servers)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        debug!("DuckDuckGo search: {:?} (max {})", query, max_results);

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        // Throttled clients get a 202 with a challenge page instead of results
        if resp.status() != reqwest::StatusCode::OK {
            return Err(SearchError::Status(resp.status().as_u16()));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        parse_results(&html, max_results)
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("selector {}: {:?}", css, e)))
}

/// Parse a DuckDuckGo HTML results page. Ads and results without a usable
/// link are skipped. A page with neither results nor the no-results marker
/// is not a results page and is an error.
pub fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);
    let result_sel = selector(".result")?;
    let link_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;
    let no_results_sel = selector(".no-results")?;

    if document.select(&result_sel).next().is_none()
        && document.select(&no_results_sel).next().is_none()
    {
        return Err(SearchError::Parse("no results markup in page".to_string()));
    }

    let mut results = Vec::new();
    for element in document.select(&result_sel) {
        if results.len() >= max_results {
            break;
        }
        if element.value().classes().any(|c| c == "result--ad") {
            continue;
        }

        let Some(link) = element.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(resolve_result_url) else {
            continue;
        };

        let title = link.text().collect::<String>().trim().to_string();
        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(SearchResult { title, url, snippet });
    }

    Ok(results)
}

/// Turn a result href into a target URL, unwrapping `/l/?uddg=` redirects
pub fn resolve_result_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = reqwest::Url::parse(&absolute).ok()?;
    let is_redirect = parsed
        .host_str()
        .map(|h| h.ends_with("duckduckgo.com"))
        .unwrap_or(false)
        && parsed.path().starts_with("/l/");

    if is_redirect {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .filter(|target| target.starts_with("http://") || target.starts_with("https://"));
    }

    match parsed.scheme() {
        "http" | "https" => Some(parsed.to_string()),
        _ => None,
    }
}

// ============================================================================
// Fake Search Provider (Testing)
// ============================================================================

/// Canned search results keyed by exact query
pub struct FakeSearchProvider {
    responses: HashMap<String, Result<Vec<SearchResult>, SearchError>>,
    default_response: Result<Vec<SearchResult>, SearchError>,
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeSearchProvider {
    /// Provider that returns no results for any query
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: Ok(Vec::new()),
            call_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Provider whose every call fails
    pub fn all_failing(error: SearchError) -> Self {
        Self {
            default_response: Err(error),
            ..Self::new()
        }
    }

    pub fn with_results(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.responses.insert(query.to_string(), Ok(results));
        self
    }

    /// Same results for every query without an explicit entry
    pub fn with_default_results(mut self, results: Vec<SearchResult>) -> Self {
        self.default_response = Ok(results);
        self
    }

    pub fn failing_for(mut self, query: &str, error: SearchError) -> Self {
        self.responses.insert(query.to_string(), Err(error));
        self
    }

    pub fn call_count(&self, query: &str) -> usize {
        self.call_counts
            .lock()
            .unwrap()
            .get(query)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }
}

impl Default for FakeSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for FakeSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        {
            let mut counts = self.call_counts.lock().unwrap();
            *counts.entry(query.to_string()).or_insert(0) += 1;
        }

        let response = self
            .responses
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());

        response.map(|mut results| {
            results.truncate(max_results);
            results
        })
    }
}
