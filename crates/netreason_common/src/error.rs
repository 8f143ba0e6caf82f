//! Error types for NetReason.
//!
//! Transport errors (generation, search, fetch) are absorbed by the stage that
//! owns them. Only `QueryError` and `ContextError` reach the shell.

use thiserror::Error;

/// Failure talking to the text-generation service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("Generation service not reachable: {0}")]
    NotAvailable(String),

    #[error("Generation request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl GenerateError {
    /// Text used when a failure is folded into user-visible output
    pub fn to_degraded_text(&self) -> String {
        format!("Error generating response: {}", self)
    }
}

/// Malformed knowledge-gate reply
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateParseError {
    #[error("gate reply is missing field {0}")]
    MissingField(&'static str),

    #[error("gate reply repeats field {0}")]
    DuplicateField(&'static str),

    #[error("gate reply has invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Knowledge gate failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    #[error("knowledge evaluation failed: {0}")]
    Transport(#[from] GenerateError),

    #[error(transparent)]
    Parse(#[from] GateParseError),
}

/// Search provider failure (never crosses the retriever boundary)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Network(String),

    #[error("Search returned HTTP {0}")]
    Status(u16),

    #[error("Search results could not be parsed: {0}")]
    Parse(String),
}

/// Per-URL fetch or extraction failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No readable text")]
    Empty,
}

/// Context window invariant violation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("turn needs {needed} chars but the context budget is {budget}")]
    ExceedsBudget { needed: usize, budget: usize },
}

/// Configuration loading or validation failure
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a whole query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Error processing query: {0}")]
    Gate(#[from] GateParseError),

    #[error(transparent)]
    Context(#[from] ContextError),
}
