//! Static/dynamic page classification.
//!
//! Static pages get the paragraph crawl, dynamic pages the generic extractor.
//! Which classifier runs is a config choice (`search.classifier`).

use super::fetch::PageFetcher;
use crate::config::{ClassifierKind, SearchConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Static,
    Dynamic,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

#[async_trait]
pub trait PageClassifier: Send + Sync {
    /// Never fails: anything that cannot be decided is `Dynamic`
    async fn classify(&self, url: &str, fetcher: &dyn PageFetcher) -> PageKind;

    fn name(&self) -> &'static str;
}

/// Probe GET; static iff the response is a success and looks like HTML
pub struct ProbeClassifier {
    timeout: Duration,
}

impl ProbeClassifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PageClassifier for ProbeClassifier {
    async fn classify(&self, url: &str, fetcher: &dyn PageFetcher) -> PageKind {
        match fetcher.fetch(url, self.timeout).await {
            Ok(page) if page.is_success() && page.body.to_lowercase().contains("<html") => {
                PageKind::Static
            }
            Ok(page) => {
                debug!("Probe {} -> dynamic (status {})", url, page.status);
                PageKind::Dynamic
            }
            Err(e) => {
                debug!("Probe {} failed, treating as dynamic: {}", url, e);
                PageKind::Dynamic
            }
        }
    }

    fn name(&self) -> &'static str {
        "probe"
    }
}

/// HEAD request; static iff Content-Type is text/html
pub struct ContentTypeClassifier {
    timeout: Duration,
}

impl ContentTypeClassifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PageClassifier for ContentTypeClassifier {
    async fn classify(&self, url: &str, fetcher: &dyn PageFetcher) -> PageKind {
        match fetcher.head(url, self.timeout).await {
            Ok(page) => {
                let is_html = page
                    .content_type
                    .map(|ct| ct.to_lowercase().contains("text/html"))
                    .unwrap_or(false);
                if is_html {
                    PageKind::Static
                } else {
                    PageKind::Dynamic
                }
            }
            Err(e) => {
                debug!("HEAD {} failed, treating as dynamic: {}", url, e);
                PageKind::Dynamic
            }
        }
    }

    fn name(&self) -> &'static str {
        "content_type"
    }
}

/// Classifier selected by `search.classifier`
pub fn classifier_for(config: &SearchConfig) -> Box<dyn PageClassifier> {
    let timeout = Duration::from_secs(config.probe_timeout_secs);
    match config.classifier {
        ClassifierKind::Probe => Box::new(ProbeClassifier::new(timeout)),
        ClassifierKind::ContentType => Box::new(ContentTypeClassifier::new(timeout)),
    }
}
