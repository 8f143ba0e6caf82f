//! Context window - bounded conversation memory.
//!
//! Turns serialize as `role: content`, plus `\nReasoning:\n<chain>` when the
//! turn carries a non-empty chain, joined by a blank line. After every insert
//! the oldest turns are evicted until the serialized length (in chars) fits
//! the budget. Turns are never truncated.

use crate::error::ContextError;
use crate::reasoning::ReasoningChain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Separator between serialized turns
const TURN_SEPARATOR: &str = "\n\n";

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}

/// One conversation turn, immutable after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
    reasoning: ReasoningChain,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            reasoning: ReasoningChain::new(),
        }
    }

    pub fn with_reasoning(role: Role, content: impl Into<String>, reasoning: ReasoningChain) -> Self {
        Self {
            reasoning,
            ..Self::new(role, content)
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, reasoning: ReasoningChain) -> Self {
        Self::with_reasoning(Role::Assistant, content, reasoning)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn reasoning(&self) -> &ReasoningChain {
        &self.reasoning
    }

    pub fn render(&self, include_reasoning: bool) -> String {
        let mut text = format!("{}: {}", self.role, self.content);
        if include_reasoning && !self.reasoning.is_empty() {
            text.push_str("\nReasoning:\n");
            text.push_str(&self.reasoning.render());
        }
        text
    }

    /// Serialized length in chars, reasoning included
    fn budget_len(&self) -> usize {
        self.render(true).chars().count()
    }
}

/// Ordered turns under a character budget
#[derive(Debug, Clone)]
pub struct ContextWindow {
    turns: VecDeque<Turn>,
    /// Cached `budget_len` per turn, parallel to `turns`
    lens: VecDeque<usize>,
    max_chars: usize,
}

impl ContextWindow {
    pub fn new(max_chars: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            lens: VecDeque::new(),
            max_chars,
        }
    }

    /// Fresh window holding a single system turn
    pub fn with_system_prompt(max_chars: usize, system_prompt: &str) -> Result<Self, ContextError> {
        let mut window = Self::new(max_chars);
        window.push(Turn::system(system_prompt))?;
        Ok(window)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Append one turn, then evict oldest turns until the budget holds
    pub fn push(&mut self, turn: Turn) -> Result<(), ContextError> {
        let needed = turn.budget_len();
        self.check_fits(needed)?;
        self.insert(turn, needed);
        self.trim();
        Ok(())
    }

    /// Append a user/assistant pair atomically: both turns or neither
    pub fn commit_exchange(&mut self, user: Turn, assistant: Turn) -> Result<(), ContextError> {
        let user_len = user.budget_len();
        let assistant_len = assistant.budget_len();
        self.check_fits(user_len + TURN_SEPARATOR.len() + assistant_len)?;
        self.insert(user, user_len);
        self.insert(assistant, assistant_len);
        self.trim();
        Ok(())
    }

    /// Drop every turn and start again from a system turn
    pub fn reset(&mut self, system_prompt: &str) -> Result<(), ContextError> {
        let fresh = Self::with_system_prompt(self.max_chars, system_prompt)?;
        *self = fresh;
        Ok(())
    }

    /// Serialized length in chars, reasoning included
    pub fn serialized_len(&self) -> usize {
        let body: usize = self.lens.iter().sum();
        body + self.lens.len().saturating_sub(1) * TURN_SEPARATOR.len()
    }

    pub fn render(&self, include_reasoning: bool) -> String {
        self.turns
            .iter()
            .map(|t| t.render(include_reasoning))
            .collect::<Vec<_>>()
            .join(TURN_SEPARATOR)
    }

    fn check_fits(&self, needed: usize) -> Result<(), ContextError> {
        if needed > self.max_chars {
            return Err(ContextError::ExceedsBudget {
                needed,
                budget: self.max_chars,
            });
        }
        Ok(())
    }

    fn insert(&mut self, turn: Turn, len: usize) {
        self.turns.push_back(turn);
        self.lens.push_back(len);
    }

    fn trim(&mut self) {
        while self.serialized_len() > self.max_chars {
            if let (Some(evicted), Some(_)) = (self.turns.pop_front(), self.lens.pop_front()) {
                debug!("Context budget exceeded, evicted oldest {} turn", evicted.role());
            } else {
                break;
            }
        }
    }
}
