//! Errors surfaced to the command line.

use termgpt_types::{ConfigError, ContextError, HistoryError, ProviderError, TokenError};

/// Anything that can abandon a turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The prompt was empty after trimming.
    #[error("empty prompt")]
    EmptyPrompt,
    /// Configuration could not be loaded, saved or applied.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// No tokenizer is available for the configured model.
    #[error("{0} (set tokenizer_model to a known model name, or to \"estimate\")")]
    Token(#[from] TokenError),
    /// The request does not fit the token budget.
    #[error("request rejected: {0}")]
    Context(#[from] ContextError),
    /// The history file could not be read or written.
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    /// The completion API call failed.
    #[error("completion failed: {0}")]
    Provider(#[from] ProviderError),
    /// Terminal I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Whether the interactive loop should carry on after this error.
    ///
    /// Everything is recoverable except broken terminal I/O.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_error_message() {
        let err = ChatError::from(ContextError::BudgetExceeded {
            required: 9000,
            available: 6192,
        });
        assert_eq!(
            err.to_string(),
            "request rejected: request needs 9000 tokens but only 6192 are available"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn token_error_suggests_tokenizer_setting() {
        let err = ChatError::from(TokenError::EncodingUnavailable {
            model: "my-deployment".into(),
        });
        assert!(err.to_string().contains("tokenizer_model"));
    }

    #[test]
    fn io_error_is_fatal() {
        let err = ChatError::from(std::io::Error::other("closed"));
        assert!(!err.is_recoverable());
    }
}
