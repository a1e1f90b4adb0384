//! Conversation turns and validated queries.
//!
//! Turns are immutable records of one side of an exchange. A conversation
//! is an ordered sequence of turns; the resolver builds every outbound chat
//! request from one.

use serde::{Deserialize, Serialize};

use crate::error::AnswerError;

/// Role of the message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// User input
    User,
    /// Assistant response
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the author
    pub role: TurnRole,

    /// Message text
    pub content: String,
}

impl Turn {
    /// Create a new turn.
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// User-supplied query text.
///
/// A `Query` is never blank: construction trims the input and rejects it
/// when nothing is left, so holding one means validation already happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Validate and wrap raw query text.
    pub fn parse(raw: &str) -> Result<Self, AnswerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AnswerError::InvalidInput(
                "The text parameter is required".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap this query as a user turn.
    pub fn to_turn(&self) -> Turn {
        Turn::user(self.0.clone())
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_trims_input() {
        let query = Query::parse("  What is Rust?  ").unwrap();
        assert_eq!(query.as_str(), "What is Rust?");
    }

    #[test]
    fn test_query_rejects_blank() {
        for raw in ["", "   ", "\n\t  "] {
            let result = Query::parse(raw);
            assert!(
                matches!(result, Err(AnswerError::InvalidInput(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_turn_serializes_lowercase_role() {
        let turn = Turn::assistant("Paris");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Paris"}"#);
    }

    #[test]
    fn test_query_to_turn() {
        let turn = Query::parse("hello").unwrap().to_turn();
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "hello");
    }
}
