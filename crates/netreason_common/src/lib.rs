//! Core types and pipeline for NetReason.
//!
//! Knowledge gate, web retrieval with session caches, reasoning chain and
//! bounded conversation memory, wired together by the orchestration policy.

pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod gate;
pub mod llm_trait;
pub mod ollama;
pub mod orchestrator;
pub mod prompts;
pub mod query;
pub mod reasoning;
pub mod search;
pub mod session;

pub use config::{ClassifierKind, ContextConfig, ModelConfig, NetReasonConfig, SearchConfig};
pub use conversation::{ContextWindow, Role, Turn};
pub use error::{
    ConfigError, ContextError, FetchError, GateError, GateParseError, GenerateError, QueryError,
    SearchError,
};
pub use events::{EventSink, NoopSink, PipelineEvent};
pub use gate::{Branch, GateDecision, KnowledgeGate};
pub use llm_trait::{FakeGenerationClient, FakeGenerationClientBuilder, GenerationClient};
pub use ollama::OllamaClient;
pub use orchestrator::{QueryOutcome, ReasoningEngine};
pub use query::{normalize_query, QuerySynthesizer};
pub use reasoning::{ReasoningChain, ReasoningStep, ThoughtStage};
pub use search::{
    content_key, ContentTypeClassifier, DuckDuckGoProvider, Evidence, FakePageFetcher,
    FakeSearchProvider, FetchedPage, HttpFetcher, PageClassifier, PageFetcher, PageKind,
    ParsedPage, ProbeClassifier, SearchProvider, SearchResult, WebRetriever,
};
pub use session::Session;
