//! Error types for all termgpt crates.

use std::path::PathBuf;
use std::time::Duration;

/// Errors from token counting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No tokenization scheme is known for the model.
    #[error("no token encoding available for model {model:?}")]
    EncodingUnavailable {
        /// The model identifier that failed to resolve.
        model: String,
    },
}

/// Errors from building a request window.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The system and user messages alone do not fit the prompt budget.
    #[error("request needs {required} tokens but only {available} are available")]
    BudgetExceeded {
        /// Tokens needed by the system and user messages.
        required: usize,
        /// `max_total_tokens - max_response_tokens`.
        available: usize,
    },
    /// Token counting failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

/// Errors from the history store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The history file does not exist.
    #[error("no history file at {}", .0.display())]
    NotFound(PathBuf),
    /// The history file is not a valid JSON array of entries.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// I/O error while reading or writing the file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from configuration handling.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading or writing the config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid JSON for the config schema.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// No setting with this key exists.
    #[error("unknown setting: {0}")]
    UnknownSetting(String),
    /// The value could not be parsed or failed validation.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Setting key.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },
    /// No run mode with this name exists.
    #[error("unknown run mode: {0}")]
    UnknownRunMode(String),
}

/// Errors from the completion API.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    // Transient
    /// Network-level error (connection reset, DNS failure, broken body stream).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if the API gave one.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Provider service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model or deployment does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// A response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The server reported an error in the middle of a stream.
    #[error("stream error: {0}")]
    StreamError(String),
}

impl ProviderError {
    /// Whether this error is likely transient.
    ///
    /// Only used to word messages to the user; requests are never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimit { .. }
                | Self::Timeout(_)
                | Self::ServiceUnavailable(_)
        )
    }
}
