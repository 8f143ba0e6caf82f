//! Interactive session: the engine plus conversation memory.

use crate::config::NetReasonConfig;
use crate::conversation::{ContextWindow, Turn};
use crate::error::{ContextError, QueryError};
use crate::orchestrator::{QueryOutcome, ReasoningEngine};
use crate::reasoning::ReasoningChain;
use tracing::debug;

pub struct Session {
    engine: ReasoningEngine,
    context: ContextWindow,
    system_prompt: String,
    last_reasoning: Option<ReasoningChain>,
}

impl Session {
    pub fn new(
        engine: ReasoningEngine,
        max_chars: usize,
        system_prompt: &str,
    ) -> Result<Self, ContextError> {
        Ok(Self {
            engine,
            context: ContextWindow::with_system_prompt(max_chars, system_prompt)?,
            system_prompt: system_prompt.to_string(),
            last_reasoning: None,
        })
    }

    pub fn from_config(config: &NetReasonConfig) -> Result<Self, ContextError> {
        Self::new(
            ReasoningEngine::from_config(config),
            config.context.max_chars,
            &config.context.system_prompt,
        )
    }

    pub fn engine(&self) -> &ReasoningEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ReasoningEngine {
        &mut self.engine
    }

    pub fn context(&self) -> &ContextWindow {
        &self.context
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn last_reasoning(&self) -> Option<&ReasoningChain> {
        self.last_reasoning.as_ref()
    }

    /// Run a query against the current conversation without recording it.
    /// Dropping the future leaves the session untouched.
    pub async fn query(&self, text: &str) -> Result<QueryOutcome, QueryError> {
        let conversation = self.context.render(false);
        self.engine.process_query(text, &conversation).await
    }

    /// Record a finished exchange: both turns or neither. The chain becomes
    /// the one `explain` shows even if the window rejects the pair.
    pub fn record(&mut self, text: &str, outcome: &QueryOutcome) -> Result<(), ContextError> {
        self.last_reasoning = Some(outcome.chain.clone());
        self.context.commit_exchange(
            Turn::user(text),
            Turn::assistant(outcome.answer.clone(), outcome.chain.clone()),
        )?;
        debug!(
            "Context: {} turn(s), {}/{} chars",
            self.context.len(),
            self.context.serialized_len(),
            self.context.max_chars()
        );
        Ok(())
    }

    /// `query` then `record`
    pub async fn ask(&mut self, text: &str) -> Result<QueryOutcome, QueryError> {
        let outcome = self.query(text).await?;
        self.record(text, &outcome)?;
        Ok(outcome)
    }

    /// Start over from the system prompt
    pub fn clear(&mut self) -> Result<(), ContextError> {
        self.context.reset(&self.system_prompt)
    }

    /// Replace the system prompt, then clear
    pub fn set_system_prompt(&mut self, prompt: &str) -> Result<(), ContextError> {
        self.context.reset(prompt)?;
        self.system_prompt = prompt.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::conversation::Role;
    use crate::llm_trait::{FakeGenerationClientBuilder, GenerationClient};
    use crate::search::{classifier_for, FakePageFetcher, FakeSearchProvider, WebRetriever};
    use std::sync::Arc;

    fn session(max_chars: usize) -> Session {
        let client: Arc<dyn GenerationClient> = Arc::new(
            FakeGenerationClientBuilder::new()
                .reply_when("KNOWLEDGE CHECK", "NEEDS_SEARCH: No\nCONFIDENCE: 0.9\nREASON: known")
                .reply_when("FINAL SYNTHESIS", "answer")
                .default_reply("note")
                .build(),
        );
        let config = SearchConfig::default();
        let retriever = WebRetriever::new(
            Arc::new(FakeSearchProvider::new()),
            Arc::new(FakePageFetcher::new()),
            classifier_for(&config),
            &config,
        );
        let engine = ReasoningEngine::new(client, retriever, &config);
        Session::new(engine, max_chars, "be brief").unwrap()
    }

    #[tokio::test]
    async fn test_ask_commits_both_turns() {
        let mut session = session(4096);
        let outcome = session.ask("hello").await.unwrap();

        let roles: Vec<Role> = session.context().turns().map(|t| t.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(session.last_reasoning(), Some(&outcome.chain));
    }

    #[tokio::test]
    async fn test_query_alone_does_not_record() {
        let session = session(4096);
        session.query("hello").await.unwrap();
        assert_eq!(session.context().len(), 1);
        assert!(session.last_reasoning().is_none());
    }

    #[tokio::test]
    async fn test_oversized_exchange_is_rejected_whole() {
        let mut session = session(64);
        let err = session.ask("hello").await.unwrap_err();

        assert!(matches!(err, QueryError::Context(ContextError::ExceedsBudget { .. })));
        assert_eq!(session.context().len(), 1);
        assert!(session.last_reasoning().is_some());
    }

    #[tokio::test]
    async fn test_set_system_prompt_resets() {
        let mut session = session(4096);
        session.ask("hello").await.unwrap();
        session.set_system_prompt("be verbose").unwrap();

        assert_eq!(session.context().len(), 1);
        assert_eq!(session.system_prompt(), "be verbose");
        assert_eq!(session.context().render(false), "system: be verbose");

        session.clear().unwrap();
        assert_eq!(session.context().render(false), "system: be verbose");
    }
}
