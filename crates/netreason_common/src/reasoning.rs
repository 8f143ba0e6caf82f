//! Reasoning chain - append-only audit trail of pipeline steps.
//!
//! Every stage of a query writes one step with a confidence score.
//! Steps are never reordered or removed once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage that produced a reasoning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtStage {
    InitialThoughts,
    SearchRequired,
    Analysis,
    Critique,
    Refinement,
    FinalAnswer,
}

impl ThoughtStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialThoughts => "initial_thoughts",
            Self::SearchRequired => "search_required",
            Self::Analysis => "analysis",
            Self::Critique => "critique",
            Self::Refinement => "refinement",
            Self::FinalAnswer => "final_answer",
        }
    }
}

impl std::fmt::Display for ThoughtStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One labeled step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub stage: ThoughtStage,
    pub content: String,
    /// Always within [0, 1]
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl ReasoningStep {
    /// Render as `stage:\ncontent\nConfidence: x.xx`
    pub fn render(&self) -> String {
        format!(
            "{}:\n{}\nConfidence: {:.2}",
            self.stage, self.content, self.confidence
        )
    }
}

/// Ordered sequence of reasoning steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    steps: Vec<ReasoningStep>,
}

impl ReasoningChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Confidence is clamped into [0, 1]; NaN becomes 0.
    pub fn add_thought(&mut self, stage: ThoughtStage, content: impl Into<String>, confidence: f64) {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self.steps.push(ReasoningStep {
            stage,
            content: content.into(),
            confidence,
            timestamp: Utc::now(),
        });
    }

    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&ReasoningStep> {
        self.steps.last()
    }

    /// Stages in insertion order
    pub fn stages(&self) -> Vec<ThoughtStage> {
        self.steps.iter().map(|s| s.stage).collect()
    }

    /// Most recent step of the given stage
    pub fn latest(&self, stage: ThoughtStage) -> Option<&ReasoningStep> {
        self.steps.iter().rev().find(|s| s.stage == stage)
    }

    /// Full transcript, blocks separated by a blank line
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(ReasoningStep::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
