//! Deterministic orchestration tests.
//!
//! FakeGenerationClient routes replies by prompt heading; FakeSearchProvider
//! and FakePageFetcher stand in for the web. Nothing touches the network.

use netreason_common::search::classifier_for;
use netreason_common::{
    Branch, FakeGenerationClient, FakeGenerationClientBuilder, FakePageFetcher,
    FakeSearchProvider, FetchError, GateParseError, GenerateError, GenerationClient, QueryError,
    ReasoningEngine, SearchConfig, SearchResult, ThoughtStage, WebRetriever,
};
use std::sync::Arc;

fn result(title: &str, url: &str) -> SearchResult {
    SearchResult::new(title, url, "")
}

const ARTICLE: &str = "<html><body><h1>Release</h1><p>Rust 1.80 shipped in July.</p></body></html>";

fn gate_reply(needs_search: &str, confidence: &str) -> String {
    format!(
        "NEEDS_SEARCH: {}\nCONFIDENCE: {}\nREASON: test decision",
        needs_search, confidence
    )
}

fn scripted(gate: &str) -> FakeGenerationClientBuilder {
    FakeGenerationClientBuilder::new()
        .reply_when("KNOWLEDGE CHECK", gate)
        .reply_when("INTENT ANALYSIS", "The user wants recent Rust news.")
        .reply_when("SEARCH QUERY DESIGN", "query: rust release")
        .reply_when("FINAL SYNTHESIS", "Final answer.")
        .reply_when("CRITIQUE OF", "Critique text.")
        .default_reply("Analysis text.")
}

fn engine_with(
    client: Arc<dyn GenerationClient>,
    provider: FakeSearchProvider,
    fetcher: FakePageFetcher,
    config: &SearchConfig,
) -> ReasoningEngine {
    let retriever = WebRetriever::new(
        Arc::new(provider),
        Arc::new(fetcher),
        classifier_for(config),
        config,
    );
    ReasoningEngine::new(client, retriever, config)
}

fn web_with_article() -> (FakeSearchProvider, FakePageFetcher) {
    let provider = FakeSearchProvider::new().with_results(
        "rust release",
        vec![result("Rust blog", "https://blog.rust-lang.org/")],
    );
    let fetcher = FakePageFetcher::new().with_html("https://blog.rust-lang.org/", ARTICLE);
    (provider, fetcher)
}

fn assert_chain_shape(stages: &[ThoughtStage]) {
    assert_eq!(stages.first(), Some(&ThoughtStage::InitialThoughts));
    assert_eq!(stages.last(), Some(&ThoughtStage::FinalAnswer));
    let middle = &stages[1..stages.len() - 1];
    assert_eq!(middle.len() % 2, 0, "unpaired steps: {:?}", stages);
    for pair in middle.chunks(2) {
        assert_eq!(pair, [ThoughtStage::Analysis, ThoughtStage::Critique]);
    }
}

// ============================================================================
// Gate Branch Tests
// ============================================================================

#[tokio::test]
async fn test_confident_no_search_goes_direct() {
    let fake = Arc::new(scripted(&gate_reply("No", "0.75")).build());
    let (provider, fetcher) = web_with_article();
    let engine = engine_with(fake.clone(), provider, fetcher, &SearchConfig::default());

    let outcome = engine.process_query("When did Rust 1.0 ship?", "").await.unwrap();

    assert_eq!(outcome.branch, Branch::Direct);
    assert_eq!(
        outcome.chain.stages(),
        vec![
            ThoughtStage::InitialThoughts,
            ThoughtStage::Analysis,
            ThoughtStage::Critique,
            ThoughtStage::FinalAnswer
        ]
    );
    assert_eq!(outcome.chain.steps()[1].confidence, 0.75);
    assert_eq!(outcome.chain.steps()[2].confidence, 0.85);
    assert_eq!(fake.calls_matching("SEARCH QUERY DESIGN"), 0);
}

#[tokio::test]
async fn test_threshold_confidence_goes_to_search() {
    let fake = Arc::new(scripted(&gate_reply("No", "0.70")).build());
    let (provider, fetcher) = web_with_article();
    let engine = engine_with(fake.clone(), provider, fetcher, &SearchConfig::default());

    let outcome = engine.process_query("q", "").await.unwrap();
    assert_eq!(outcome.branch, Branch::SearchAugmented);
    assert_eq!(fake.calls_matching("SEARCH QUERY DESIGN"), 1);
}

#[tokio::test]
async fn test_needs_search_overrides_confidence() {
    let fake = Arc::new(scripted(&gate_reply("Yes", "0.99")).build());
    let (provider, fetcher) = web_with_article();
    let engine = engine_with(fake, provider, fetcher, &SearchConfig::default());

    let outcome = engine.process_query("q", "").await.unwrap();
    assert_eq!(outcome.branch, Branch::SearchAugmented);
}

#[tokio::test]
async fn test_malformed_gate_reply_fails_query() {
    let fake = Arc::new(scripted("NEEDS_SEARCH: No\nREASON: forgot confidence").build());
    let engine = engine_with(
        fake.clone(),
        FakeSearchProvider::new(),
        FakePageFetcher::new(),
        &SearchConfig::default(),
    );

    let err = engine.process_query("q", "").await.unwrap_err();
    assert_eq!(err, QueryError::Gate(GateParseError::MissingField("CONFIDENCE")));
    assert!(err.to_string().starts_with("Error processing query:"));
    assert_eq!(fake.total_calls(), 1);
}

// ============================================================================
// Search Branch Tests
// ============================================================================

#[tokio::test]
async fn test_search_branch_with_evidence() {
    let fake = Arc::new(scripted(&gate_reply("Yes", "0.3")).build());
    let (provider, fetcher) = web_with_article();
    let engine = engine_with(fake.clone(), provider, fetcher, &SearchConfig::default());

    let outcome = engine.process_query("What shipped in July?", "").await.unwrap();

    assert_eq!(outcome.answer, "Final answer.");
    let confidences: Vec<f64> = outcome.chain.steps().iter().map(|s| s.confidence).collect();
    assert_eq!(confidences, vec![0.3, 0.8, 0.85, 0.95]);
    assert_chain_shape(&outcome.chain.stages());

    let analysis_prompt = fake
        .prompts()
        .into_iter()
        .find(|p| p.prompt.starts_with("EVIDENCE ANALYSIS"))
        .unwrap();
    assert_eq!(analysis_prompt.temperature, 0.4);
    assert!(analysis_prompt
        .prompt
        .contains("Source 1 (https://blog.rust-lang.org/):\nTitle: \nRust 1.80 shipped in July."));
}

#[tokio::test]
async fn test_empty_evidence_skips_analysis() {
    let fake = Arc::new(scripted(&gate_reply("Yes", "0.2")).build());
    let provider = FakeSearchProvider::new().with_results(
        "rust release",
        vec![
            result("a", "https://a.example/"),
            result("b", "https://b.example/"),
        ],
    );
    let fetcher = FakePageFetcher::new()
        .failing("https://a.example/", FetchError::Timeout)
        .failing("https://b.example/", FetchError::Status(404));
    let engine = engine_with(fake.clone(), provider, fetcher, &SearchConfig::default());

    let outcome = engine.process_query("q", "").await.unwrap();

    assert_eq!(
        outcome.chain.stages(),
        vec![ThoughtStage::InitialThoughts, ThoughtStage::FinalAnswer]
    );
    assert_eq!(fake.calls_matching("EVIDENCE ANALYSIS"), 0);
}

#[tokio::test]
async fn test_failed_analysis_adds_no_pair() {
    let fake = Arc::new(
        FakeGenerationClientBuilder::new()
            .reply_when("KNOWLEDGE CHECK", &gate_reply("Yes", "0.1"))
            .reply_when("SEARCH QUERY DESIGN", "rust release")
            .fail_when("EVIDENCE ANALYSIS", GenerateError::Timeout)
            .reply_when("FINAL SYNTHESIS", "done")
            .default_reply("x")
            .build(),
    );
    let (provider, fetcher) = web_with_article();
    let engine = engine_with(fake.clone(), provider, fetcher, &SearchConfig::default());

    let outcome = engine.process_query("q", "").await.unwrap();
    assert_eq!(
        outcome.chain.stages(),
        vec![ThoughtStage::InitialThoughts, ThoughtStage::FinalAnswer]
    );
    assert_eq!(fake.calls_matching("CRITIQUE OF FINDINGS"), 0);
}

#[tokio::test]
async fn test_failed_critique_keeps_pair() {
    let fake = Arc::new(
        FakeGenerationClientBuilder::new()
            .reply_when("KNOWLEDGE CHECK", &gate_reply("No", "0.9"))
            .fail_when("CRITIQUE OF ANALYSIS", GenerateError::Http("502".to_string()))
            .reply_when("FINAL SYNTHESIS", "done")
            .default_reply("analysis")
            .build(),
    );
    let engine = engine_with(
        fake,
        FakeSearchProvider::new(),
        FakePageFetcher::new(),
        &SearchConfig::default(),
    );

    let outcome = engine.process_query("q", "").await.unwrap();
    assert_chain_shape(&outcome.chain.stages());

    let critique = outcome.chain.latest(ThoughtStage::Critique).unwrap();
    assert_eq!(critique.confidence, 0.0);
    assert!(critique.content.starts_with("Error generating response:"));
}

#[tokio::test]
async fn test_later_iterations_see_previous_critique() {
    let fake = Arc::new(scripted(&gate_reply("Yes", "0.5")).build());
    let (provider, fetcher) = web_with_article();
    let config = SearchConfig {
        max_iterations: 2,
        ..SearchConfig::default()
    };
    let engine = engine_with(fake.clone(), provider, fetcher, &config);

    let outcome = engine.process_query("q", "").await.unwrap();

    assert_eq!(fake.calls_matching("INTENT ANALYSIS"), 1);
    assert_eq!(fake.calls_matching("SEARCH QUERY DESIGN"), 2);
    assert_eq!(fake.calls_matching("Iteration: 2 of 2"), 1);
    assert_eq!(fake.calls_matching("Previous critique:\nCritique text."), 1);
    assert_chain_shape(&outcome.chain.stages());
    assert_eq!(outcome.chain.len(), 6);
}

#[tokio::test]
async fn test_generation_service_down_still_answers() {
    let fake = Arc::new(FakeGenerationClient::failing(GenerateError::NotAvailable(
        "connection refused".to_string(),
    )));
    let engine = engine_with(
        fake,
        FakeSearchProvider::new(),
        FakePageFetcher::new(),
        &SearchConfig::default(),
    );

    let outcome = engine.process_query("q", "").await.unwrap();
    assert_eq!(outcome.branch, Branch::SearchAugmented);
    assert!(outcome.answer.contains("connection refused"));
    assert_chain_shape(&outcome.chain.stages());
}

// ============================================================================
// Chain Invariants
// ============================================================================

#[tokio::test]
async fn test_every_branch_keeps_chain_invariants() {
    for gate in [gate_reply("No", "0.95"), gate_reply("Yes", "0.4")] {
        let fake = Arc::new(scripted(&gate).build());
        let (provider, fetcher) = web_with_article();
        let engine = engine_with(fake, provider, fetcher, &SearchConfig::default());

        let outcome = engine.process_query("q", "").await.unwrap();
        let stages = outcome.chain.stages();
        assert_chain_shape(&stages);

        for step in outcome.chain.steps() {
            assert!((0.0..=1.0).contains(&step.confidence));
        }
        assert_eq!(outcome.chain.last().unwrap().confidence, 0.95);
        assert_eq!(outcome.chain.last().unwrap().content, outcome.answer);
    }
}
