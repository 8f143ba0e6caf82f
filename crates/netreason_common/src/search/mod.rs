//! Web retrieval: search, URL selection, page fetch and extraction, with
//! session caches for result lists and parsed pages.
//!
//! Failures never leave this module. A failed search is an empty result
//! list, a failed page is absent from the evidence.

pub mod cache;
pub mod classify;
pub mod extract;
pub mod fetch;
pub mod provider;

pub use cache::{content_key, KeyedCache, ParseCache, SearchCache};
pub use classify::{
    classifier_for, ContentTypeClassifier, PageClassifier, PageKind, ProbeClassifier,
};
pub use extract::{extract_generic, paragraph_text_nodes};
pub use fetch::{FakePageFetcher, FetchedPage, HttpFetcher, PageFetcher};
pub use provider::{DuckDuckGoProvider, FakeSearchProvider, SearchProvider};

use crate::config::SearchConfig;
use crate::error::FetchError;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(title: &str, url: &str, snippet: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }
}

/// Readable text extracted from one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPage {
    pub title: String,
    pub body_text: String,
}

/// Successfully parsed pages in URL-list order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evidence {
    pages: Vec<(String, ParsedPage)>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless `url` is already present
    pub fn push(&mut self, url: impl Into<String>, page: ParsedPage) {
        let url = url.into();
        if self.get(&url).is_none() {
            self.pages.push((url, page));
        }
    }

    pub fn get(&self, url: &str) -> Option<&ParsedPage> {
        self.pages.iter().find(|(u, _)| u == url).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParsedPage)> {
        self.pages.iter().map(|(u, p)| (u.as_str(), p))
    }

    pub fn urls(&self) -> Vec<&str> {
        self.pages.iter().map(|(u, _)| u.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// First `max_urls` result URLs in provider order, duplicates collapsed to
/// their first position
pub fn choose_urls(results: &[SearchResult], max_urls: usize) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for result in results.iter().take(max_urls) {
        if !urls.contains(&result.url) {
            urls.push(result.url.clone());
        }
    }
    urls
}

/// Search + fetch + parse with per-session caches
pub struct WebRetriever {
    provider: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    classifier: Box<dyn PageClassifier>,
    search_cache: SearchCache,
    parse_cache: ParseCache,
    max_results: usize,
    fetch_timeout: Duration,
}

impl WebRetriever {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        classifier: Box<dyn PageClassifier>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            provider,
            fetcher,
            classifier,
            search_cache: SearchCache::new(),
            parse_cache: ParseCache::new(),
            max_results: config.max_results,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// DuckDuckGo + HTTP fetcher + the configured classifier
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            Arc::new(DuckDuckGoProvider::new(config)),
            Arc::new(HttpFetcher::new(config)),
            classifier_for(config),
            config,
        )
    }

    /// Cached result list for the exact query string. Provider failures
    /// give an empty list that is not cached.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        if let Some(results) = self.search_cache.get(query) {
            debug!("Search cache hit: {:?}", query);
            return results;
        }

        match self.provider.search(query, self.max_results).await {
            Ok(results) => {
                debug!("Search {:?}: {} results", query, results.len());
                self.search_cache.insert_if_absent(query, results)
            }
            Err(e) => {
                warn!("Search failed for {:?}: {}", query, e);
                Vec::new()
            }
        }
    }

    /// Parsed page for `url`, from the parse cache when possible
    pub async fn parse_page(&self, url: &str) -> Result<ParsedPage, FetchError> {
        let key = content_key(url);
        if let Some(page) = self.parse_cache.get(&key) {
            debug!("Parse cache hit: {}", url);
            return Ok(page);
        }

        let kind = self.classifier.classify(url, self.fetcher.as_ref()).await;
        debug!("{} classified as {} ({})", url, kind, self.classifier.name());

        let page = match kind {
            PageKind::Static => ParsedPage {
                title: String::new(),
                body_text: self.fetcher.crawl_paragraphs(url, self.fetch_timeout).await?,
            },
            PageKind::Dynamic => {
                let fetched = self.fetcher.fetch(url, self.fetch_timeout).await?;
                if !fetched.is_success() {
                    return Err(FetchError::Status(fetched.status));
                }
                extract_generic(&fetched.body)?
            }
        };

        if page.body_text.trim().is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(self.parse_cache.insert_if_absent(&key, page))
    }

    /// Search, select, then fetch the selected URLs concurrently
    pub async fn retrieve(&self, query: &str, max_urls: usize) -> Evidence {
        let results = self.search(query).await;
        let urls = choose_urls(&results, max_urls);

        let parsed = join_all(urls.iter().map(|url| self.parse_page(url))).await;

        let mut evidence = Evidence::new();
        for (url, outcome) in urls.into_iter().zip(parsed) {
            match outcome {
                Ok(page) => evidence.push(url, page),
                Err(e) => warn!("Skipping {}: {}", url, e),
            }
        }

        info!(
            "Retrieved {} page(s) for {:?} ({} result(s))",
            evidence.len(),
            query,
            results.len()
        );
        evidence
    }

    pub fn cached_queries(&self) -> usize {
        self.search_cache.len()
    }

    pub fn cached_pages(&self) -> usize {
        self.parse_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;

    fn result(title: &str, url: &str) -> SearchResult {
        SearchResult::new(title, url, "")
    }

    const PAGE: &str = "<html><body><h1>Heading</h1><p>Body text.</p></body></html>";

    fn retriever(provider: FakeSearchProvider, fetcher: Arc<FakePageFetcher>) -> WebRetriever {
        let config = SearchConfig::default();
        WebRetriever::new(Arc::new(provider), fetcher, classifier_for(&config), &config)
    }

    #[test]
    fn test_choose_urls_takes_prefix_and_dedupes() {
        let results = vec![
            result("a", "https://a/"),
            result("a again", "https://a/"),
            result("b", "https://b/"),
            result("c", "https://c/"),
        ];
        assert_eq!(choose_urls(&results, 3), vec!["https://a/", "https://b/"]);
        assert!(choose_urls(&results, 0).is_empty());
    }

    #[test]
    fn test_evidence_keeps_first_position() {
        let page = ParsedPage {
            title: String::new(),
            body_text: "x".to_string(),
        };
        let mut evidence = Evidence::new();
        evidence.push("https://a/", page.clone());
        evidence.push("https://b/", page.clone());
        evidence.push("https://a/", page);
        assert_eq!(evidence.urls(), vec!["https://a/", "https://b/"]);
    }

    #[tokio::test]
    async fn test_static_page_uses_paragraph_crawl() {
        let fetcher = Arc::new(FakePageFetcher::new().with_html("https://a/", PAGE));
        let retriever = retriever(FakeSearchProvider::new(), fetcher.clone());

        let page = retriever.parse_page("https://a/").await.unwrap();
        assert_eq!(page.title, "");
        assert_eq!(page.body_text, "Body text.");
        // probe + crawl
        assert_eq!(fetcher.fetch_count("https://a/"), 2);
    }

    #[tokio::test]
    async fn test_dynamic_page_uses_generic_extractor() {
        let fetcher = Arc::new(FakePageFetcher::new().with_page(
            "https://a/",
            FetchedPage {
                status: 200,
                content_type: Some("text/plain".to_string()),
                body: "<h1>Heading</h1><p>Body text.</p>".to_string(),
            },
        ));
        let retriever = retriever(FakeSearchProvider::new(), fetcher);

        let page = retriever.parse_page("https://a/").await.unwrap();
        assert_eq!(page.title, "Heading");
        assert_eq!(page.body_text, "Body text.");
    }

    #[tokio::test]
    async fn test_empty_page_is_not_cached() {
        let fetcher = Arc::new(
            FakePageFetcher::new().with_html("https://a/", "<html><body><div>no paragraphs</div></body></html>"),
        );
        let retriever = retriever(FakeSearchProvider::new(), fetcher);

        assert_eq!(retriever.parse_page("https://a/").await, Err(FetchError::Empty));
        assert_eq!(retriever.cached_pages(), 0);
    }

    #[tokio::test]
    async fn test_failed_search_is_not_cached() {
        let provider = FakeSearchProvider::all_failing(SearchError::Status(503));
        let retriever = retriever(provider, Arc::new(FakePageFetcher::new()));

        assert!(retriever.search("rust").await.is_empty());
        assert_eq!(retriever.cached_queries(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_skips_failed_urls_in_order() {
        let provider = FakeSearchProvider::new().with_results(
            "q",
            vec![
                result("one", "https://one/"),
                result("two", "https://two/"),
                result("three", "https://three/"),
            ],
        );
        let fetcher = Arc::new(
            FakePageFetcher::new()
                .with_html("https://one/", PAGE)
                .failing("https://two/", FetchError::Timeout)
                .with_html("https://three/", PAGE),
        );
        let retriever = retriever(provider, fetcher);

        let evidence = retriever.retrieve("q", 3).await;
        assert_eq!(evidence.urls(), vec!["https://one/", "https://three/"]);
    }
}
