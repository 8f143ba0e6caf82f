//! Knowledge-sufficiency gate.
//!
//! One generation call decides whether the model can answer from what it
//! knows or needs retrieval. The reply grammar is three `KEY: value` lines
//! (any order), each exactly once:
//!
//! ```text
//! NEEDS_SEARCH: Yes | No
//! CONFIDENCE: 0.0 .. 1.0
//! REASON: free text
//! ```

use crate::error::{GateError, GateParseError};
use crate::llm_trait::GenerationClient;
use crate::prompts::{self, PromptKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Direct answers need the model to be more than this confident
pub const DIRECT_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub needs_search: bool,
    pub confidence: f64,
    pub reason: String,
}

impl GateDecision {
    pub fn branch(&self) -> Branch {
        Branch::decide(self.needs_search, self.confidence)
    }

    /// Content of the InitialThoughts step
    pub fn summary(&self) -> String {
        format!(
            "Initial evaluation: {}\nConfidence level: {:.2}\nNeed external search: {}",
            self.reason, self.confidence, self.needs_search
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Direct,
    SearchAugmented,
}

impl Branch {
    pub fn decide(needs_search: bool, confidence: f64) -> Self {
        if !needs_search && confidence > DIRECT_CONFIDENCE_THRESHOLD {
            Self::Direct
        } else {
            Self::SearchAugmented
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::SearchAugmented => write!(f, "search_augmented"),
        }
    }
}

const NEEDS_SEARCH: &str = "NEEDS_SEARCH";
const CONFIDENCE: &str = "CONFIDENCE";
const REASON: &str = "REASON";

/// Remove markdown emphasis, brackets and quotes around a value
fn clean_value(raw: &str) -> String {
    raw.replace("**", "")
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '"' | '\'' | '*' | '`'))
        .trim()
        .to_string()
}

/// Split `KEY: value`, tolerating markdown around the key
fn split_field(line: &str) -> Option<(&'static str, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key
        .replace("**", "")
        .trim()
        .trim_start_matches(|c| matches!(c, '-' | '*' | ' '))
        .to_ascii_uppercase();

    let field = match key.as_str() {
        NEEDS_SEARCH => NEEDS_SEARCH,
        CONFIDENCE => CONFIDENCE,
        REASON => REASON,
        _ => return None,
    };
    Some((field, clean_value(value)))
}

fn set_once(
    slot: &mut Option<String>,
    field: &'static str,
    value: String,
) -> Result<(), GateParseError> {
    if slot.is_some() {
        return Err(GateParseError::DuplicateField(field));
    }
    *slot = Some(value);
    Ok(())
}

/// Parse a gate reply
pub fn parse_gate_reply(reply: &str) -> Result<GateDecision, GateParseError> {
    let mut needs_search = None;
    let mut confidence = None;
    let mut reason = None;

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((field, value)) = split_field(line) else {
            continue;
        };
        match field {
            NEEDS_SEARCH => set_once(&mut needs_search, field, value)?,
            CONFIDENCE => set_once(&mut confidence, field, value)?,
            _ => set_once(&mut reason, field, value)?,
        }
    }

    let needs_search = needs_search.ok_or(GateParseError::MissingField(NEEDS_SEARCH))?;
    let confidence = confidence.ok_or(GateParseError::MissingField(CONFIDENCE))?;
    let reason = reason.ok_or(GateParseError::MissingField(REASON))?;

    let needs_search = match needs_search.to_ascii_lowercase().as_str() {
        "yes" | "true" => true,
        "no" | "false" => false,
        _ => {
            return Err(GateParseError::InvalidValue {
                field: NEEDS_SEARCH,
                value: needs_search,
            })
        }
    };

    let confidence = match confidence.parse::<f64>() {
        Ok(c) if c.is_finite() && (0.0..=1.0).contains(&c) => c,
        _ => {
            return Err(GateParseError::InvalidValue {
                field: CONFIDENCE,
                value: confidence,
            })
        }
    };

    if reason.is_empty() {
        return Err(GateParseError::InvalidValue {
            field: REASON,
            value: reason,
        });
    }

    Ok(GateDecision {
        needs_search,
        confidence,
        reason,
    })
}

pub struct KnowledgeGate {
    client: Arc<dyn GenerationClient>,
}

impl KnowledgeGate {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    pub async fn evaluate(&self, query: &str) -> Result<GateDecision, GateError> {
        let kind = PromptKind::KnowledgeCheck;
        let reply = self
            .client
            .generate(&prompts::knowledge_check(query), kind.temperature())
            .await?;
        debug!("Gate reply: {:?}", reply);
        Ok(parse_gate_reply(&reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerateError;
    use crate::llm_trait::FakeGenerationClient;

    #[test]
    fn test_branch_threshold_is_strict() {
        assert_eq!(Branch::decide(false, 0.75), Branch::Direct);
        assert_eq!(Branch::decide(false, 0.70), Branch::SearchAugmented);
        assert_eq!(Branch::decide(true, 0.99), Branch::SearchAugmented);
    }

    #[test]
    fn test_parse_plain_reply() {
        let decision =
            parse_gate_reply("NEEDS_SEARCH: No\nCONFIDENCE: 0.9\nREASON: Stable historical fact")
                .unwrap();
        assert!(!decision.needs_search);
        assert_eq!(decision.confidence, 0.9);
        assert_eq!(decision.reason, "Stable historical fact");
    }

    #[test]
    fn test_parse_tolerates_decoration_and_order() {
        let reply = "Sure, here you go.\n\n**REASON:** needs today's prices\nNEEDS_SEARCH: [Yes]\n- CONFIDENCE: \"0.4\"";
        let decision = parse_gate_reply(reply).unwrap();
        assert!(decision.needs_search);
        assert_eq!(decision.confidence, 0.4);
        assert_eq!(decision.reason, "needs today's prices");
    }

    #[test]
    fn test_reason_keeps_inner_colons() {
        let decision =
            parse_gate_reply("NEEDS_SEARCH: true\nCONFIDENCE: 1\nREASON: see: the 2024 report")
                .unwrap();
        assert_eq!(decision.reason, "see: the 2024 report");
    }

    #[test]
    fn test_missing_field() {
        let err = parse_gate_reply("NEEDS_SEARCH: No\nREASON: x").unwrap_err();
        assert_eq!(err, GateParseError::MissingField("CONFIDENCE"));
    }

    #[test]
    fn test_duplicate_field() {
        let err =
            parse_gate_reply("NEEDS_SEARCH: No\nNEEDS_SEARCH: Yes\nCONFIDENCE: 0.5\nREASON: x")
                .unwrap_err();
        assert_eq!(err, GateParseError::DuplicateField("NEEDS_SEARCH"));
    }

    #[test]
    fn test_invalid_values() {
        let err = parse_gate_reply("NEEDS_SEARCH: maybe\nCONFIDENCE: 0.5\nREASON: x").unwrap_err();
        assert!(matches!(err, GateParseError::InvalidValue { field: "NEEDS_SEARCH", .. }));

        let err = parse_gate_reply("NEEDS_SEARCH: No\nCONFIDENCE: 1.5\nREASON: x").unwrap_err();
        assert!(matches!(err, GateParseError::InvalidValue { field: "CONFIDENCE", .. }));

        let err = parse_gate_reply("NEEDS_SEARCH: No\nCONFIDENCE: NaN\nREASON: x").unwrap_err();
        assert!(matches!(err, GateParseError::InvalidValue { field: "CONFIDENCE", .. }));

        let err = parse_gate_reply("NEEDS_SEARCH: No\nCONFIDENCE: 0.5\nREASON: []").unwrap_err();
        assert!(matches!(err, GateParseError::InvalidValue { field: "REASON", .. }));
    }

    #[tokio::test]
    async fn test_evaluate_uses_low_temperature() {
        let fake = Arc::new(FakeGenerationClient::always(
            "NEEDS_SEARCH: No\nCONFIDENCE: 0.8\nREASON: known",
        ));
        let gate = KnowledgeGate::new(fake.clone());

        let decision = gate.evaluate("capital of France").await.unwrap();
        assert_eq!(decision.branch(), Branch::Direct);

        let prompts = fake.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].temperature, 0.3);
        assert!(prompts[0].prompt.contains("capital of France"));
    }

    #[tokio::test]
    async fn test_evaluate_transport_error() {
        let gate = KnowledgeGate::new(Arc::new(FakeGenerationClient::failing(GenerateError::Timeout)));
        let err = gate.evaluate("q").await.unwrap_err();
        assert_eq!(err, GateError::Transport(GenerateError::Timeout));
    }
}
