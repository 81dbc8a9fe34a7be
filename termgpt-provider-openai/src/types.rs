//! Request and response payloads of the Chat Completions API.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat>

use serde::{Deserialize, Serialize};
use termgpt_context::Window;
use termgpt_types::{ChatMessage, TokenUsage};

/// Sampling parameters shared by every request of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Model name (ignored by Azure, which routes by deployment).
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens in the reply.
    pub max_tokens: u32,
    /// Nucleus sampling mass.
    pub top_p: f64,
    /// Penalty for frequent tokens.
    pub frequency_penalty: f64,
    /// Penalty for tokens already present.
    pub presence_penalty: f64,
    /// Request a streamed reply.
    pub stream: bool,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            temperature: 0.5,
            max_tokens: 2000,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: true,
        }
    }
}

/// The JSON body POSTed to the completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model name.
    pub model: String,
    /// `[system] + history + [user]`.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens in the reply.
    pub max_tokens: u32,
    /// Nucleus sampling mass.
    pub top_p: f64,
    /// Penalty for frequent tokens.
    pub frequency_penalty: f64,
    /// Penalty for tokens already present.
    pub presence_penalty: f64,
    /// Whether the reply is streamed.
    pub stream: bool,
}

impl ChatRequest {
    /// Combine sampling parameters with a message list.
    #[must_use]
    pub fn new(params: &CompletionParams, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: params.model.clone(),
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
            stream: params.stream,
        }
    }

    /// Build the request for a budget-checked window.
    #[must_use]
    pub fn from_window(params: &CompletionParams, window: &Window) -> Self {
        Self::new(params, window.messages.clone())
    }
}

/// One decoded `data:` line of a streamed reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChunkEvent {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    pub(crate) fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown streaming error")
    }
}

/// A non-streamed completion.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseChoice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}
