//! Resolved answers and the response payload returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of source produced the final answer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceUsed {
    /// A primary chat-completion provider
    Primary,
    /// Web search instant answer
    WebSearch,
    /// Encyclopedia topic summary
    Encyclopedia,
    /// Canned message, no source produced an answer
    FallbackMessage,
}

impl SourceUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceUsed::Primary => "primary",
            SourceUsed::WebSearch => "web_search",
            SourceUsed::Encyclopedia => "encyclopedia",
            SourceUsed::FallbackMessage => "fallback_message",
        }
    }
}

impl std::fmt::Display for SourceUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit the resolver hands back for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text
    pub text: String,

    /// Source that produced `text`
    pub source_used: SourceUsed,

    /// Whether the primary answer was flagged as stale
    pub stale: bool,
}

impl Answer {
    pub fn new(text: impl Into<String>, source_used: SourceUsed, stale: bool) -> Self {
        Self {
            text: text.into(),
            source_used,
            stale,
        }
    }
}

/// Fixed-shape payload returned by `resolve`.
///
/// Every branch of the pipeline, failures included, produces one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// HTTP-style status code (200, 400, 500, 503)
    pub status_code: u16,

    /// Answer text or user-facing failure message
    pub message: String,

    /// Source that produced the message, absent for validation/internal failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_used: Option<SourceUsed>,

    /// Whether the primary answer was flagged as stale
    pub stale: bool,

    /// When the response was produced
    pub timestamp: DateTime<Utc>,

    /// Conversation the exchange was recorded under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl AnswerResponse {
    /// Successful response carrying an answer.
    pub fn ok(answer: Answer) -> Self {
        Self {
            status_code: 200,
            message: answer.text,
            source_used: Some(answer.source_used),
            stale: answer.stale,
            timestamp: Utc::now(),
            conversation_id: None,
        }
    }

    /// Failure response with no answer source.
    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            source_used: None,
            stale: false,
            timestamp: Utc::now(),
            conversation_id: None,
        }
    }

    /// Attach the conversation identity.
    pub fn with_conversation(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_carries_answer() {
        let response = AnswerResponse::ok(Answer::new("Paris", SourceUsed::Primary, false));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.message, "Paris");
        assert_eq!(response.source_used, Some(SourceUsed::Primary));
        assert!(response.is_success());
    }

    #[test]
    fn test_failure_response_shape() {
        let response = AnswerResponse::failure(400, "The text parameter is required");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status_code"], 400);
        assert_eq!(json["stale"], false);
        assert!(json.get("source_used").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_source_used_wire_names() {
        let json = serde_json::to_string(&SourceUsed::WebSearch).unwrap();
        assert_eq!(json, "\"web_search\"");
        assert_eq!(SourceUsed::FallbackMessage.to_string(), "fallback_message");
    }
}
