//! Core conversation types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the whole conversation.
    System,
    /// A human user.
    User,
    /// The model.
    Assistant,
}

impl Role {
    /// The lowercase wire name of this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted turn of the conversation.
///
/// Serialized as `{"role": ..., "content": ..., "tokenCount": ...}` so that
/// history files stay human-editable. A missing `tokenCount` reads as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who produced this turn.
    pub role: Role,
    /// The text of the turn.
    pub content: String,
    /// Token count measured when the entry was appended.
    #[serde(rename = "tokenCount", default)]
    pub token_count: usize,
}

impl HistoryEntry {
    /// Create an entry with an unset (zero) token count.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            token_count: 0,
        }
    }

    /// Shorthand for a user entry.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Shorthand for an assistant entry.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A message as sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a message.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&HistoryEntry> for ChatMessage {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            role: entry.role,
            content: entry.content.clone(),
        }
    }
}

/// Token usage as reported by the API (only present on some backends).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: usize,
    /// Tokens in the completion.
    pub completion_tokens: usize,
}

/// A finished assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// The accumulated reply text.
    pub text: String,
    /// Tokens in `text`, counted once on the joined reply.
    pub response_tokens: usize,
    /// Sum of the per-chunk token counts observed while streaming.
    ///
    /// Equal to `response_tokens` for non-streamed replies. May differ slightly
    /// from it for streamed replies because chunk boundaries split tokens.
    pub chunk_tokens: usize,
    /// Why generation stopped, if the server said.
    pub finish_reason: Option<String>,
    /// Server-reported usage, if the server sent it.
    pub usage: Option<TokenUsage>,
}

/// Per-turn accounting handed back to the caller for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnStats {
    /// Tokens in the system message plus the new user message.
    pub prompt_tokens: usize,
    /// Tokens of replayed history included in the request.
    pub history_tokens: usize,
    /// Tokens in the reply.
    pub response_tokens: usize,
    /// History entries included in the request.
    pub history_kept: usize,
    /// History entries left out to respect the budget.
    pub history_dropped: usize,
    /// Wall-clock time for the round trip.
    pub elapsed: Duration,
}

impl TurnStats {
    /// Everything sent plus everything received.
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.prompt_tokens + self.history_tokens + self.response_tokens
    }
}

impl fmt::Display for TurnStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[tokens {} (prompt {} | history {} | reply {}) {}s]",
            self.total_tokens(),
            self.prompt_tokens,
            self.history_tokens,
            self.response_tokens,
            self.elapsed.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
    }

    #[test]
    fn history_entry_uses_camel_case_token_count() {
        let mut entry = HistoryEntry::user("hi");
        entry.token_count = 1;
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["tokenCount"], 1);
        assert!(json.get("token_count").is_none());
    }

    #[test]
    fn missing_token_count_defaults_to_zero() {
        let entry: HistoryEntry =
            serde_json::from_str(r#"{"role":"user","content":"hello"}"#).unwrap();
        assert_eq!(entry.token_count, 0);
    }

    #[test]
    fn turn_stats_total_and_display() {
        let stats = TurnStats {
            prompt_tokens: 10,
            history_tokens: 5,
            response_tokens: 7,
            elapsed: Duration::from_secs(3),
            ..TurnStats::default()
        };
        assert_eq!(stats.total_tokens(), 22);
        assert_eq!(
            stats.to_string(),
            "[tokens 22 (prompt 10 | history 5 | reply 7) 3s]"
        );
    }
}
