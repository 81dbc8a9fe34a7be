//! Chat completions client and builder.

use termgpt_context::TokenCounter;
use termgpt_types::{ProviderError, Reply};

use crate::error::{CONNECT_TIMEOUT, map_http_status, map_reqwest_error};
use crate::streaming::read_stream;
use crate::types::{ChatRequest, CompletionResponse};

/// Default OpenAI chat completions endpoint.
const DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Which API the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// An OpenAI-compatible endpoint, authenticated with a bearer token.
    OpenAi {
        /// Full chat completions URL.
        url: String,
    },
    /// An Azure OpenAI resource, authenticated with an `api-key` header.
    ///
    /// The request's model names the deployment.
    Azure {
        /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
        endpoint: String,
        /// `api-version` query parameter.
        api_version: String,
    },
}

/// Client for the Chat Completions API.
///
/// # Example
///
/// ```no_run
/// use termgpt_provider_openai::ChatClient;
///
/// let client = ChatClient::new("sk-...").url("http://localhost:8080/v1/chat/completions");
/// ```
pub struct ChatClient {
    /// API key.
    pub(crate) api_key: String,
    /// Endpoint flavour.
    pub(crate) backend: Backend,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl ChatClient {
    /// Create a client for the OpenAI API.
    ///
    /// Default endpoint: `https://api.openai.com/v1/chat/completions`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_backend(
            api_key,
            Backend::OpenAi {
                url: DEFAULT_URL.into(),
            },
        )
    }

    /// Create a client for an Azure OpenAI resource.
    pub fn azure(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self::with_backend(
            api_key,
            Backend::Azure {
                endpoint: endpoint.into(),
                api_version: api_version.into(),
            },
        )
    }

    fn with_backend(api_key: impl Into<String>, backend: Backend) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.into(),
            backend,
            client,
        }
    }

    /// Override the OpenAI endpoint URL.
    ///
    /// Useful for testing with a local mock server or an API proxy. Has no
    /// effect on an Azure client.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        if let Backend::OpenAi { url: current } = &mut self.backend {
            *current = url.into();
        }
        self
    }

    /// The configured backend.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Build the completions URL for `model`.
    pub(crate) fn completions_url(&self, model: &str) -> String {
        match &self.backend {
            Backend::OpenAi { url } => url.clone(),
            Backend::Azure {
                endpoint,
                api_version,
            } => format!(
                "{}/openai/deployments/{model}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
        }
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, ProviderError> {
        let url = self.completions_url(&request.model);
        tracing::debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "sending completion request"
        );

        let builder = self.client.post(&url).header("content-type", "application/json");
        let builder = match self.backend {
            Backend::OpenAi { .. } => builder.bearer_auth(&self.api_key),
            Backend::Azure { .. } => builder.header("api-key", &self.api_key),
        };
        let response = builder
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(map_reqwest_error)?;
            tracing::warn!(status = %status, "completion request rejected");
            return Err(map_http_status(status, &body));
        }
        Ok(response)
    }

    /// Send a streamed request, passing each content delta to `on_delta`.
    ///
    /// The request's `stream` flag is forced on. Deltas already emitted stay
    /// emitted if the stream later fails.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        counter: &dyn TokenCounter,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<Reply, ProviderError> {
        let request = ChatRequest {
            stream: true,
            ..request.clone()
        };
        let response = self.post(&request).await?;
        read_stream(response.bytes_stream(), counter, on_delta).await
    }

    /// Send a non-streamed request and return the whole reply.
    pub async fn complete_chat(
        &self,
        request: &ChatRequest,
        counter: &dyn TokenCounter,
    ) -> Result<Reply, ProviderError> {
        let request = ChatRequest {
            stream: false,
            ..request.clone()
        };
        let response = self.post(&request).await?;
        let body = response.text().await.map_err(map_reqwest_error)?;
        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Decode(format!("invalid completion response: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode("completion response has no choices".into()))?;

        let text = choice.message.content.unwrap_or_default();
        let response_tokens = counter.count(&text);
        Ok(Reply {
            text,
            response_tokens,
            chunk_tokens: response_tokens,
            finish_reason: choice.finish_reason,
            usage: parsed.usage,
        })
    }

    /// Send `request` the way its `stream` flag asks for.
    ///
    /// A non-streamed reply is passed to `on_delta` once, whole.
    pub async fn send(
        &self,
        request: &ChatRequest,
        counter: &dyn TokenCounter,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<Reply, ProviderError> {
        if request.stream {
            return self.stream_chat(request, counter, on_delta).await;
        }
        let reply = self.complete_chat(request, counter).await?;
        if !reply.text.is_empty() {
            on_delta(&reply.text);
        }
        Ok(reply)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_is_openai() {
        let client = ChatClient::new("test-key");
        assert_eq!(client.completions_url("gpt-4"), DEFAULT_URL);
    }

    #[test]
    fn builder_overrides_url() {
        let client = ChatClient::new("test-key").url("http://localhost:9999/v1/chat/completions");
        assert_eq!(
            client.completions_url("gpt-4"),
            "http://localhost:9999/v1/chat/completions"
        );
    }

    #[test]
    fn azure_url_names_deployment_and_version() {
        let client = ChatClient::azure("k", "https://res.openai.azure.com/", "2023-05-15");
        assert_eq!(
            client.completions_url("chat-prod"),
            "https://res.openai.azure.com/openai/deployments/chat-prod/chat/completions?api-version=2023-05-15"
        );
    }

    #[test]
    fn url_override_ignored_for_azure() {
        let client = ChatClient::azure("k", "https://res.openai.azure.com", "v").url("http://x");
        assert!(matches!(client.backend(), Backend::Azure { .. }));
    }

    #[test]
    fn api_key_is_stored_but_not_debugged() {
        let client = ChatClient::new("sk-secret");
        assert_eq!(client.api_key, "sk-secret");
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
