//! Orchestration policy for one query.
//!
//! ```text
//! InitialEvaluation -> DirectAnalysis | SearchAugmented -> Critique -> FinalSynthesis
//! ```
//!
//! Every stage appends to the query's `ReasoningChain`. Only a malformed
//! gate reply aborts a query; every other failure degrades.

use crate::config::{NetReasonConfig, SearchConfig};
use crate::error::{GateError, GenerateError, QueryError};
use crate::events::{EventSink, NoopSink, PipelineEvent};
use crate::gate::{Branch, GateDecision, KnowledgeGate};
use crate::llm_trait::GenerationClient;
use crate::ollama::OllamaClient;
use crate::prompts::{self, PromptKind};
use crate::query::QuerySynthesizer;
use crate::reasoning::{ReasoningChain, ThoughtStage};
use crate::search::WebRetriever;
use chrono::Local;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Confidence of an analysis grounded in retrieved evidence
pub const EVIDENCE_ANALYSIS_CONFIDENCE: f64 = 0.8;
pub const CRITIQUE_CONFIDENCE: f64 = 0.85;
pub const FINAL_ANSWER_CONFIDENCE: f64 = 0.95;

/// Result of a completed query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub answer: String,
    pub chain: ReasoningChain,
    pub branch: Branch,
}

pub struct ReasoningEngine {
    client: Arc<dyn GenerationClient>,
    gate: KnowledgeGate,
    synthesizer: QuerySynthesizer,
    retriever: WebRetriever,
    max_urls: usize,
    max_iterations: usize,
    events: Arc<dyn EventSink>,
}

impl ReasoningEngine {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        retriever: WebRetriever,
        config: &SearchConfig,
    ) -> Self {
        Self {
            gate: KnowledgeGate::new(client.clone()),
            synthesizer: QuerySynthesizer::new(client.clone()),
            client,
            retriever,
            max_urls: config.max_urls,
            max_iterations: config.max_iterations.max(1),
            events: Arc::new(NoopSink),
        }
    }

    /// Ollama + DuckDuckGo, as configured
    pub fn from_config(config: &NetReasonConfig) -> Self {
        Self::new(
            Arc::new(OllamaClient::new(&config.model)),
            WebRetriever::from_config(&config.search),
            &config.search,
        )
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn set_events(&mut self, events: Arc<dyn EventSink>) {
        self.events = events;
    }

    pub fn retriever(&self) -> &WebRetriever {
        &self.retriever
    }

    /// Run one query. `conversation` is the rendered context window
    /// (without reasoning) used by final synthesis.
    pub async fn process_query(
        &self,
        query: &str,
        conversation: &str,
    ) -> Result<QueryOutcome, QueryError> {
        let span = info_span!("query", id = %Uuid::new_v4());
        self.run(query, conversation).instrument(span).await
    }

    async fn run(&self, query: &str, conversation: &str) -> Result<QueryOutcome, QueryError> {
        let mut chain = ReasoningChain::new();

        self.events.emit(PipelineEvent::Evaluating);
        let decision = match self.gate.evaluate(query).await {
            Ok(decision) => decision,
            Err(GateError::Parse(e)) => {
                warn!("Gate reply rejected: {}", e);
                return Err(QueryError::Gate(e));
            }
            Err(GateError::Transport(e)) => {
                warn!("Gate unavailable, falling back to search: {}", e);
                GateDecision {
                    needs_search: true,
                    confidence: 0.0,
                    reason: format!("knowledge evaluation failed ({})", e),
                }
            }
        };

        chain.add_thought(
            ThoughtStage::InitialThoughts,
            decision.summary(),
            decision.confidence,
        );

        let branch = decision.branch();
        info!(
            "Branch {} (needs_search={}, confidence={:.2})",
            branch, decision.needs_search, decision.confidence
        );

        match branch {
            Branch::Direct => self.direct(query, decision.confidence, &mut chain).await,
            Branch::SearchAugmented => self.search_augmented(query, &mut chain).await,
        }

        let answer = self.synthesize(query, conversation, &chain).await;
        chain.add_thought(ThoughtStage::FinalAnswer, answer.clone(), FINAL_ANSWER_CONFIDENCE);

        Ok(QueryOutcome {
            answer,
            chain,
            branch,
        })
    }

    async fn generate(&self, kind: PromptKind, prompt: &str) -> Result<String, GenerateError> {
        self.client.generate(prompt, kind.temperature()).await
    }

    async fn direct(&self, query: &str, confidence: f64, chain: &mut ReasoningChain) {
        self.events.emit(PipelineEvent::DirectAnalysis);
        let analysis = match self
            .generate(PromptKind::DirectAnalysis, &prompts::direct_analysis(query))
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Direct analysis failed: {}", e);
                return;
            }
        };
        chain.add_thought(ThoughtStage::Analysis, analysis.clone(), confidence);

        self.critique(
            PromptKind::DirectCritique,
            &prompts::direct_critique(&analysis),
            chain,
        )
        .await;
    }

    async fn search_augmented(&self, query: &str, chain: &mut ReasoningChain) {
        let intent = self.synthesizer.analyze_intent(query).await;
        let mut previous_critique: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            let search_query = self
                .synthesizer
                .synthesize(
                    &intent,
                    query,
                    iteration,
                    self.max_iterations,
                    previous_critique.as_deref(),
                )
                .await;
            info!("Iteration {}/{}: {:?}", iteration, self.max_iterations, search_query);
            self.events.emit(PipelineEvent::Searching {
                query: search_query.clone(),
            });

            let evidence = self.retriever.retrieve(&search_query, self.max_urls).await;
            self.events.emit(PipelineEvent::Retrieved {
                pages: evidence.len(),
            });
            if evidence.is_empty() {
                info!("No evidence for iteration {}", iteration);
                continue;
            }

            let sources = prompts::evidence_block(&evidence);
            let analysis = match self
                .generate(
                    PromptKind::EvidenceAnalysis,
                    &prompts::evidence_analysis(query, &sources),
                )
                .await
            {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!("Evidence analysis failed: {}", e);
                    continue;
                }
            };
            chain.add_thought(
                ThoughtStage::Analysis,
                analysis.clone(),
                EVIDENCE_ANALYSIS_CONFIDENCE,
            );

            if let Some(critique) = self
                .critique(
                    PromptKind::EvidenceCritique,
                    &prompts::evidence_critique(&analysis),
                    chain,
                )
                .await
            {
                previous_critique = Some(critique);
            }
        }
    }

    /// Append a Critique step. A failed call still appends one, holding the
    /// error text at confidence 0.
    async fn critique(
        &self,
        kind: PromptKind,
        prompt: &str,
        chain: &mut ReasoningChain,
    ) -> Option<String> {
        self.events.emit(PipelineEvent::Critiquing);
        match self.generate(kind, prompt).await {
            Ok(critique) => {
                chain.add_thought(ThoughtStage::Critique, critique.clone(), CRITIQUE_CONFIDENCE);
                Some(critique)
            }
            Err(e) => {
                warn!("Critique failed: {}", e);
                chain.add_thought(ThoughtStage::Critique, e.to_degraded_text(), 0.0);
                None
            }
        }
    }

    async fn synthesize(&self, query: &str, conversation: &str, chain: &ReasoningChain) -> String {
        self.events.emit(PipelineEvent::Synthesizing);
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
        let prompt = prompts::final_synthesis(query, &timestamp, conversation, &chain.render());

        match self.generate(PromptKind::FinalSynthesis, &prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Final synthesis failed: {}", e);
                e.to_degraded_text()
            }
        }
    }
}
