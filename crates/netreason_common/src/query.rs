//! Intent analysis and search-query synthesis.

use crate::llm_trait::GenerationClient;
use crate::prompts::{self, PromptKind};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};

const LABELS: [&str; 2] = ["query:", "search:"];

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

/// Peel matching quote pairs off both ends
fn strip_wrapping_quotes(mut text: &str) -> &str {
    loop {
        let mut chars = text.chars();
        match (chars.next(), chars.next_back()) {
            (Some(first), Some(last)) if first == last && is_quote(first) => {
                text = text[first.len_utf8()..text.len() - last.len_utf8()].trim();
            }
            _ => return text,
        }
    }
}

fn strip_label_prefix(word: &str) -> Option<&str> {
    LABELS.iter().find_map(|label| {
        let head = word.get(..label.len())?;
        head.eq_ignore_ascii_case(label).then(|| &word[label.len()..])
    })
}

/// Clean a model-written search query.
///
/// Wrapping quotes are removed, `query:`/`search:` labels are dropped
/// (case-insensitive), and whitespace is collapsed. Quotes around inner
/// phrases are kept.
///
/// A standalone label token is dropped wherever it appears, since models
/// emit it mid-query too. A literal `search:` word in a question is lost.
pub fn normalize_query(raw: &str) -> String {
    let unwrapped = strip_wrapping_quotes(raw.trim());

    let mut words: Vec<&str> = Vec::new();
    for (i, word) in unwrapped.split_whitespace().enumerate() {
        if LABELS.iter().any(|label| word.eq_ignore_ascii_case(label)) {
            continue;
        }
        if i == 0 {
            if let Some(rest) = strip_label_prefix(word) {
                if !rest.is_empty() {
                    words.push(rest);
                }
                continue;
            }
        }
        words.push(word);
    }

    words.join(" ")
}

pub struct QuerySynthesizer {
    client: Arc<dyn GenerationClient>,
}

impl QuerySynthesizer {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// One-sentence statement of the user's goal. Falls back to the query.
    pub async fn analyze_intent(&self, query: &str) -> String {
        let kind = PromptKind::Intent;
        match self
            .client
            .generate(&prompts::intent(query), kind.temperature())
            .await
        {
            Ok(intent) if !intent.trim().is_empty() => intent.trim().to_string(),
            Ok(_) => query.to_string(),
            Err(e) => {
                warn!("Intent analysis failed, using the query as intent: {}", e);
                query.to_string()
            }
        }
    }

    /// Search query for this iteration, normalized. Falls back to the
    /// normalized original query.
    pub async fn synthesize(
        &self,
        intent: &str,
        original_query: &str,
        iteration: usize,
        max_iterations: usize,
        previous_critique: Option<&str>,
    ) -> String {
        self.synthesize_on(
            intent,
            original_query,
            iteration,
            max_iterations,
            previous_critique,
            Local::now().date_naive(),
        )
        .await
    }

    pub async fn synthesize_on(
        &self,
        intent: &str,
        original_query: &str,
        iteration: usize,
        max_iterations: usize,
        previous_critique: Option<&str>,
        today: NaiveDate,
    ) -> String {
        let kind = PromptKind::SearchQuery;
        let prompt = prompts::search_query(
            intent,
            original_query,
            iteration,
            max_iterations,
            previous_critique,
            today,
        );

        let fallback = || normalize_query(original_query);
        match self.client.generate(&prompt, kind.temperature()).await {
            Ok(reply) => {
                let query = normalize_query(&reply);
                if query.is_empty() {
                    debug!("Synthesized query was empty, using the original");
                    fallback()
                } else {
                    query
                }
            }
            Err(e) => {
                warn!("Query synthesis failed, using the original query: {}", e);
                fallback()
            }
        }
    }
}
