//! Generation client trait abstraction.
//!
//! Production code uses `OllamaClient`. Tests use `FakeGenerationClient`
//! with scripted replies so pipelines run without network access.

use crate::error::GenerateError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

// ============================================================================
// Generation Client Trait
// ============================================================================

/// Single-shot text generation. One request per call, returns the fully
/// joined response text.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerateError>;
}

// ============================================================================
// Fake Generation Client (Testing)
// ============================================================================

/// Recorded call, for assertions
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    pub prompt: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
struct ScriptedReply {
    needle: String,
    reply: Result<String, GenerateError>,
}

/// Fake client that answers by substring match on the prompt.
///
/// Rules are checked in insertion order; the first rule whose needle occurs
/// in the prompt wins. Unmatched prompts get the default reply.
///
/// ```rust,ignore
/// let fake = FakeGenerationClientBuilder::new()
///     .reply_when("KNOWLEDGE CHECK", "NEEDS_SEARCH: No\nCONFIDENCE: 0.9\nREASON: stable fact")
///     .default_reply("ok")
///     .build();
/// ```
pub struct FakeGenerationClient {
    rules: Vec<ScriptedReply>,
    default_reply: Result<String, GenerateError>,
    calls: Arc<Mutex<Vec<RecordedPrompt>>>,
}

impl FakeGenerationClient {
    /// Client that returns the same text for every prompt
    pub fn always(reply: &str) -> Self {
        FakeGenerationClientBuilder::new().default_reply(reply).build()
    }

    /// Client whose every call fails
    pub fn failing(error: GenerateError) -> Self {
        FakeGenerationClientBuilder::new().default_error(error).build()
    }

    /// Every prompt received, in order
    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of prompts containing `needle`
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }
}

#[async_trait]
impl GenerationClient for FakeGenerationClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerateError> {
        self.calls.lock().unwrap().push(RecordedPrompt {
            prompt: prompt.to_string(),
            temperature,
        });

        self.rules
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
            .map(|rule| rule.reply.clone())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

// ============================================================================
// Builder for FakeGenerationClient
// ============================================================================

pub struct FakeGenerationClientBuilder {
    rules: Vec<ScriptedReply>,
    default_reply: Result<String, GenerateError>,
}

impl FakeGenerationClientBuilder {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: Ok(String::new()),
        }
    }

    /// Reply with `reply` when the prompt contains `needle`
    pub fn reply_when(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push(ScriptedReply {
            needle: needle.to_string(),
            reply: Ok(reply.to_string()),
        });
        self
    }

    /// Fail with `error` when the prompt contains `needle`
    pub fn fail_when(mut self, needle: &str, error: GenerateError) -> Self {
        self.rules.push(ScriptedReply {
            needle: needle.to_string(),
            reply: Err(error),
        });
        self
    }

    pub fn default_reply(mut self, reply: &str) -> Self {
        self.default_reply = Ok(reply.to_string());
        self
    }

    pub fn default_error(mut self, error: GenerateError) -> Self {
        self.default_reply = Err(error);
        self
    }

    pub fn build(self) -> FakeGenerationClient {
        FakeGenerationClient {
            rules: self.rules,
            default_reply: self.default_reply,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for FakeGenerationClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
