//! Pipeline progress events.
//!
//! The engine reports stage transitions to an `EventSink`; the shell turns
//! them into spinner messages. The library default is `NoopSink`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Evaluating,
    DirectAnalysis,
    Searching { query: String },
    Retrieved { pages: usize },
    Critiquing,
    Synthesizing,
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evaluating => write!(f, "Evaluating knowledge base..."),
            Self::DirectAnalysis => write!(f, "Analyzing with existing knowledge..."),
            Self::Searching { query } => write!(f, "Searching: {}", query),
            Self::Retrieved { pages } => write!(f, "Parsed {} page(s)", pages),
            Self::Critiquing => write!(f, "Critical evaluation..."),
            Self::Synthesizing => write!(f, "Synthesizing final answer..."),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: PipelineEvent) {}
}
