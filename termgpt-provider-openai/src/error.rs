//! Mapping of HTTP and transport failures to [`ProviderError`].

use std::time::Duration;

use termgpt_types::ProviderError;

/// How long to wait for a connection before giving up.
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Map a non-success status from OpenAI or Azure to a [`ProviderError`].
///
/// Azure reports a missing deployment as 404, so it lands on `ModelNotFound`
/// like an unknown OpenAI model.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = error_message(body);
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(message),
        400 => ProviderError::InvalidRequest(message),
        404 => ProviderError::ModelNotFound(message),
        429 => ProviderError::RateLimit {
            retry_after: parse_retry_after(body),
        },
        500 | 502 | 503 => ProviderError::ServiceUnavailable(message),
        _ => ProviderError::InvalidRequest(format!("HTTP {status}: {message}")),
    }
}

/// Pull `error.message` out of a JSON error body, else return the body as is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Best-effort parse of "retry after N seconds" from an error body.
///
/// Both OpenAI and Azure phrase their 429 messages this way.
fn parse_retry_after(body: &str) -> Option<Duration> {
    let lower = body.to_lowercase();
    let idx = lower.find("retry after ")?;
    let digits: String = lower[idx + "retry after ".len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().ok().map(Duration::from_secs)
}

/// Map a [`reqwest::Error`] to a [`ProviderError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(CONNECT_TIMEOUT)
    } else {
        ProviderError::Network(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_401_and_403_to_authentication() {
        let err = map_http_status(reqwest::StatusCode::UNAUTHORIZED, "Invalid API key");
        assert!(matches!(err, ProviderError::Authentication(_)));
        let err = map_http_status(reqwest::StatusCode::FORBIDDEN, "nope");
        assert!(matches!(err, ProviderError::Authentication(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn map_400_to_invalid_request() {
        let err = map_http_status(reqwest::StatusCode::BAD_REQUEST, "Bad request");
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn map_404_to_model_not_found() {
        let err = map_http_status(reqwest::StatusCode::NOT_FOUND, "DeploymentNotFound");
        assert!(matches!(err, ProviderError::ModelNotFound(_)));
    }

    #[test]
    fn map_429_with_retry_after() {
        let err = map_http_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "Please retry after 20 seconds.",
        );
        match err {
            ProviderError::RateLimit { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(20)));
            }
            other => panic!("expected RateLimit, got {other:?}"),
        }
    }

    #[test]
    fn map_429_without_hint() {
        let err = map_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, ProviderError::RateLimit { retry_after: None }));
        assert!(err.is_retryable());
    }

    #[test]
    fn map_5xx_to_service_unavailable() {
        for status in [
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            reqwest::StatusCode::BAD_GATEWAY,
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = map_http_status(status, "down");
            assert!(matches!(err, ProviderError::ServiceUnavailable(_)), "{status}");
        }
    }

    #[test]
    fn map_unknown_status_keeps_code() {
        let err = map_http_status(reqwest::StatusCode::IM_A_TEAPOT, "I'm a teapot");
        match err {
            ProviderError::InvalidRequest(msg) => assert!(msg.contains("418")),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn json_error_body_is_unwrapped() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        match map_http_status(reqwest::StatusCode::UNAUTHORIZED, body) {
            ProviderError::Authentication(msg) => assert_eq!(msg, "Incorrect API key provided"),
            other => panic!("expected Authentication, got {other:?}"),
        }
    }
}
