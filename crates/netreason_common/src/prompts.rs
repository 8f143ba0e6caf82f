//! Prompt templates.
//!
//! Every prompt starts with its kind's heading on the first line. The
//! headings are unique, so a scripted client can route replies by them.

use crate::search::Evidence;
use chrono::{Duration, NaiveDate};

/// Characters of page body quoted per source in the evidence block
pub const SOURCE_EXCERPT_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    KnowledgeCheck,
    Intent,
    SearchQuery,
    DirectAnalysis,
    DirectCritique,
    EvidenceAnalysis,
    EvidenceCritique,
    FinalSynthesis,
}

impl PromptKind {
    pub fn heading(&self) -> &'static str {
        match self {
            Self::KnowledgeCheck => "KNOWLEDGE CHECK",
            Self::Intent => "INTENT ANALYSIS",
            Self::SearchQuery => "SEARCH QUERY DESIGN",
            Self::DirectAnalysis => "DIRECT ANALYSIS",
            Self::DirectCritique => "CRITIQUE OF ANALYSIS",
            Self::EvidenceAnalysis => "EVIDENCE ANALYSIS",
            Self::EvidenceCritique => "CRITIQUE OF FINDINGS",
            Self::FinalSynthesis => "FINAL SYNTHESIS",
        }
    }

    /// Sampling temperature for this call
    pub fn temperature(&self) -> f32 {
        match self {
            Self::EvidenceAnalysis | Self::FinalSynthesis => 0.4,
            _ => 0.3,
        }
    }
}

pub fn knowledge_check(query: &str) -> String {
    format!(
        "{}\n\n\
Evaluate whether you have enough knowledge to answer this query: \"{}\"\n\n\
Work through it:\n\
1. Identify the facts, dates or data the answer needs\n\
2. For each one, decide whether your knowledge is reliable, whether it changes often, \
and whether it needs checking against current sources\n\
3. Consider time: is this settled history, or does it depend on recent events?\n\n\
Respond in exactly this format, one field per line:\n\
NEEDS_SEARCH: Yes or No\n\
CONFIDENCE: a number between 0 and 1\n\
REASON: one short explanation",
        PromptKind::KnowledgeCheck.heading(),
        query
    )
}

pub fn intent(query: &str) -> String {
    format!(
        "{}\n\n\
Determine the main intent behind the user's text:\n\
1. Find the key words and phrases that reveal the goal\n\
2. Decide whether the user wants information, an action, or help\n\
3. Note context such as time, place and specific details\n\
4. Consider subtext and alternative readings\n\n\
Respond with ONE short sentence stating the user's main intent.\n\n\
User text: {}\n\n\
Intent:",
        PromptKind::Intent.heading(),
        query
    )
}

pub fn search_query(
    intent: &str,
    original_query: &str,
    iteration: usize,
    max_iterations: usize,
    previous_critique: Option<&str>,
    today: NaiveDate,
) -> String {
    let yesterday = today - Duration::days(1);
    let mut prompt = format!(
        "{}\n\n\
Current date: {}\n\
Yesterday: {}\n\n\
Write a search-engine query for:\n\
Text: {}\n\
Intent: {}\n\
Iteration: {} of {}\n\n\
Rules:\n\
1. Use 0-7 key words or phrases from the text\n\
2. Use operators where they help: \"exact phrase\", -exclude, site:domain.com, filetype:pdf\n\
3. On later iterations, target what the previous iteration missed\n",
        PromptKind::SearchQuery.heading(),
        today.format("%Y-%m-%d"),
        yesterday.format("%Y-%m-%d"),
        original_query,
        intent,
        iteration,
        max_iterations
    );

    if iteration > 1 {
        if let Some(critique) = previous_critique {
            prompt.push_str(&format!("\nPrevious critique:\n{}\n", critique));
        }
    }

    prompt.push_str("\nReturn only the query, no explanation:");
    prompt
}

pub fn direct_analysis(query: &str) -> String {
    format!(
        "{}\n\n\
Question: {}\n\n\
Analyze this step by step:\n\
1. What specific facts do we know about this?\n\
2. What are the key aspects to consider?\n\
3. How reliable is that knowledge?\n\
Give concrete facts and explain the reasoning.",
        PromptKind::DirectAnalysis.heading(),
        query
    )
}

pub fn direct_critique(analysis: &str) -> String {
    format!(
        "{}\n\n\
Given this analysis:\n{}\n\n\
Evaluate it critically:\n\
1. Which parts are most certain?\n\
2. What needs verification?\n\
3. Are there biases or gaps?\n\
Be specific about confidence levels.",
        PromptKind::DirectCritique.heading(),
        analysis
    )
}

/// Enumerated sources: url, title and the start of the body
pub fn evidence_block(evidence: &Evidence) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, (url, page))| {
            let excerpt: String = page.body_text.chars().take(SOURCE_EXCERPT_CHARS).collect();
            format!("Source {} ({}):\nTitle: {}\n{}", i + 1, url, page.title, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn evidence_analysis(query: &str, sources: &str) -> String {
    format!(
        "{}\n\n\
Analyze these search results for: {}\n\n\
{}\n\n\
Provide a detailed analysis:\n\
1. Key facts and figures found\n\
2. Credibility of the sources\n\
3. Consistency across sources\n\
4. Any conflicting information",
        PromptKind::EvidenceAnalysis.heading(),
        query,
        sources
    )
}

pub fn evidence_critique(analysis: &str) -> String {
    format!(
        "{}\n\n\
Review the search results and this analysis:\n{}\n\n\
Evaluate critically:\n\
1. Reliability of the information\n\
2. Biases or limitations\n\
3. What still needs verification\n\
4. Confidence in each aspect",
        PromptKind::EvidenceCritique.heading(),
        analysis
    )
}

pub fn final_synthesis(query: &str, timestamp: &str, conversation: &str, transcript: &str) -> String {
    format!(
        "{}\n\n\
Current timestamp: {}\n\n\
Conversation so far:\n{}\n\n\
Question: {}\n\n\
Reasoning chain:\n{}\n\n\
Write the final answer. It should:\n\
1. Address the question directly\n\
2. Use the most reliable information above\n\
3. Flag any uncertainty\n\
4. Use the timestamp when discussing current events\n\
5. Cite sources where relevant\n\
Keep it clear, concise and well structured.",
        PromptKind::FinalSynthesis.heading(),
        timestamp,
        conversation,
        query,
        transcript
    )
}
