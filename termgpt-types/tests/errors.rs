use std::path::PathBuf;
use std::time::Duration;
use termgpt_types::*;

#[test]
fn provider_error_display() {
    let err = ProviderError::RateLimit {
        retry_after: Some(Duration::from_secs(30)),
    };
    assert!(err.to_string().contains("rate limited"));
}

#[test]
fn provider_error_is_retryable() {
    assert!(
        ProviderError::Network(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset"
        )))
        .is_retryable()
    );
    assert!(ProviderError::RateLimit { retry_after: None }.is_retryable());
    assert!(ProviderError::Timeout(Duration::from_secs(5)).is_retryable());
    assert!(ProviderError::ServiceUnavailable("down".into()).is_retryable());
    assert!(!ProviderError::Authentication("bad key".into()).is_retryable());
    assert!(!ProviderError::Decode("garbled".into()).is_retryable());
}

#[test]
fn context_error_from_token_error() {
    let te = TokenError::EncodingUnavailable {
        model: "llama-3".into(),
    };
    let ce: ContextError = te.into();
    assert!(ce.to_string().contains("llama-3"));
}

#[test]
fn budget_exceeded_names_both_numbers() {
    let err = ContextError::BudgetExceeded {
        required: 9000,
        available: 6192,
    };
    let msg = err.to_string();
    assert!(msg.contains("9000"));
    assert!(msg.contains("6192"));
}

#[test]
fn history_not_found_shows_path() {
    let err = HistoryError::NotFound(PathBuf::from("/tmp/history.json"));
    assert!(err.to_string().contains("/tmp/history.json"));
}

#[test]
fn config_invalid_value_display() {
    let err = ConfigError::InvalidValue {
        key: "temperature".into(),
        reason: "must be between 0 and 2".into(),
    };
    assert_eq!(
        err.to_string(),
        "invalid value for temperature: must be between 0 and 2"
    );
}
