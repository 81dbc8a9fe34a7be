//! One conversation: config, history, tokenizer and API client.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use termgpt_config::{Config, ProviderKind};
use termgpt_context::{BudgetWindow, TokenCounter, WindowBudget, resolve_counter};
use termgpt_history::HistoryStore;
use termgpt_provider_openai::{ChatClient, ChatRequest, CompletionParams};
use termgpt_types::{ConfigError, HistoryEntry, HistoryError, TurnStats};

use crate::error::ChatError;

/// Runs user turns against the configured API.
///
/// Turns are strictly sequential: each [`ChatSession::send`] finishes its
/// round trip, including the history write, before it returns.
pub struct ChatSession {
    config: Config,
    config_path: Option<PathBuf>,
    history: HistoryStore,
    client: ChatClient,
    counter: Arc<dyn TokenCounter>,
    system_message: String,
}

impl ChatSession {
    /// Build a session from a validated config.
    ///
    /// Fails if no API key is set or no tokenizer is known for the model.
    pub fn new(config: Config, history: HistoryStore) -> Result<Self, ChatError> {
        if config.authorization_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "authorization_key".into(),
                reason: "not set; run with --set authorization_key=<key>".into(),
            }
            .into());
        }
        config.validate()?;
        let counter = resolve_counter(config.tokenizer())?;
        let client = match config.provider {
            ProviderKind::OpenAi => {
                ChatClient::new(config.authorization_key.clone()).url(config.api_url.clone())
            }
            ProviderKind::Azure => ChatClient::azure(
                config.authorization_key.clone(),
                config.api_url.clone(),
                config.azure_api_version.clone(),
            ),
        };
        tracing::debug!(
            provider = config.provider.as_str(),
            model = %config.model,
            tokenizer = config.tokenizer(),
            history = %history.path().display(),
            "session ready"
        );
        Ok(Self {
            system_message: config.system_message.clone(),
            config,
            config_path: None,
            history,
            client,
            counter,
        })
    }

    /// Save the config to `path` after every turn, recording the last prompt.
    #[must_use]
    pub fn persist_config_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use run mode `name` for this session's system message.
    ///
    /// The persisted config keeps its own system message.
    pub fn with_run_mode(mut self, name: &str) -> Result<Self, ChatError> {
        self.system_message = self.config.run_mode(name)?.to_string();
        tracing::info!(mode = name, "run mode selected");
        Ok(self)
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The history store this session appends to.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The system message sent with each request.
    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    /// Send one user message and return the turn's accounting.
    ///
    /// Content deltas are passed to `on_delta` as they arrive. The exchange is
    /// appended to history only after the whole reply was received, so a
    /// failed turn leaves history untouched. `on_delta` cannot abort the turn:
    /// once the reply has arrived it is recorded, whatever the caller did with
    /// the deltas.
    pub async fn send(
        &mut self,
        user_message: &str,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<TurnStats, ChatError> {
        let user_message = user_message.trim();
        if user_message.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        let history = self.load_history().await?;
        let window = BudgetWindow::new(self.budget(), Arc::clone(&self.counter)).build(
            &self.system_message,
            user_message,
            &history,
        )?;
        if window.dropped > 0 {
            tracing::info!(
                dropped = window.dropped,
                kept = window.kept,
                "older history left out to fit the token budget"
            );
        }

        let request = ChatRequest::from_window(&self.params(), &window);
        let started = Instant::now();
        let reply = self
            .client
            .send(&request, self.counter.as_ref(), on_delta)
            .await?;
        let elapsed = started.elapsed();

        self.history
            .append_turn(user_message, &reply.text, self.counter.as_ref())
            .await?;
        self.remember_prompt(user_message);

        let stats = TurnStats {
            prompt_tokens: window.prompt_tokens,
            history_tokens: window.history_tokens,
            response_tokens: reply.response_tokens,
            history_kept: window.kept,
            history_dropped: window.dropped,
            elapsed,
        };
        tracing::debug!(
            total = stats.total_tokens(),
            chunk_tokens = reply.chunk_tokens,
            finish_reason = ?reply.finish_reason,
            "turn complete"
        );
        Ok(stats)
    }

    /// Resend the last prompt recorded in the config.
    pub async fn send_again(
        &mut self,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<TurnStats, ChatError> {
        let last = self.config.last_user_message.clone();
        self.send(&last, on_delta).await
    }

    // A corrupt history file is dropped and the turn starts from scratch.
    async fn load_history(&self) -> Result<Vec<HistoryEntry>, ChatError> {
        match self.history.load().await {
            Ok(entries) => Ok(entries),
            Err(HistoryError::Serialization(reason)) => {
                tracing::warn!(
                    path = %self.history.path().display(),
                    reason = %reason,
                    "history file is corrupt, starting a new history"
                );
                match self.history.clear().await {
                    Ok(()) | Err(HistoryError::NotFound(_)) => Ok(Vec::new()),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remember_prompt(&mut self, user_message: &str) {
        self.config.last_user_message = user_message.to_string();
        let Some(path) = &self.config_path else {
            return;
        };
        if let Err(err) = self.config.save(path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to save config");
        }
    }

    fn budget(&self) -> WindowBudget {
        WindowBudget::new(
            self.config.max_total_tokens as usize,
            self.config.max_tokens as usize,
        )
    }

    fn params(&self) -> CompletionParams {
        CompletionParams {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
            stream: self.config.stream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            authorization_key: "sk-test".into(),
            tokenizer_model: Some("estimate".into()),
            ..Config::default()
        }
    }

    fn store() -> HistoryStore {
        HistoryStore::new("unused-history.json")
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = ChatSession::new(Config::default(), store()).err().unwrap();
        assert!(matches!(
            err,
            ChatError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "authorization_key"
        ));
    }

    #[test]
    fn unknown_tokenizer_is_rejected() {
        let config = Config {
            tokenizer_model: Some("my-azure-deployment".into()),
            ..config()
        };
        let err = ChatSession::new(config, store()).err().unwrap();
        assert!(matches!(err, ChatError::Token(_)));
    }

    #[test]
    fn run_mode_changes_session_not_config() {
        let session = ChatSession::new(config(), store())
            .unwrap()
            .with_run_mode("shell")
            .unwrap();
        assert_ne!(session.system_message(), session.config().system_message);
    }

    #[test]
    fn budget_and_params_follow_config() {
        let session = ChatSession::new(config(), store()).unwrap();
        assert_eq!(session.budget(), WindowBudget::new(8192, 2000));
        let params = session.params();
        assert_eq!(params.model, "gpt-4");
        assert!(params.stream);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_io() {
        let mut session = ChatSession::new(config(), store()).unwrap();
        let err = session.send("   ", &mut |_| {}).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyPrompt));
    }
}
