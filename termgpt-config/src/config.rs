//! The persisted configuration object.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use termgpt_types::ConfigError;

use crate::settings::{self, SETTINGS};

/// Endpoint used for the OpenAI backend unless overridden.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// The system message sent with every request unless a run mode replaces it.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a useful assistant, your input is streamed into command line regarding coding and terminal questions for a user that uses macosx and codes in python and go and uses aws frequently.";

/// Which completion API flavour to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// `api_url` is an OpenAI-compatible chat completions endpoint.
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// `api_url` is an Azure OpenAI resource endpoint and `model` a deployment name.
    #[serde(rename = "azure")]
    Azure,
}

impl ProviderKind {
    /// The name used in the config file.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
        }
    }
}

/// All tunable parameters plus the last user message.
///
/// Unknown keys in the file are ignored and missing keys take their default,
/// so older config files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion API flavour.
    pub provider: ProviderKind,
    /// Chat completions endpoint (OpenAI) or resource endpoint (Azure).
    pub api_url: String,
    /// `api-version` query parameter for Azure.
    pub azure_api_version: String,
    /// Model name, or deployment name on Azure.
    pub model: String,
    /// Model whose tokenizer measures text. Falls back to `model`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer_model: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Tokens reserved for the reply.
    pub max_tokens: u32,
    /// The model's whole context size.
    pub max_total_tokens: u32,
    /// Nucleus sampling mass.
    pub top_p: f64,
    /// Penalty for frequent tokens.
    pub frequency_penalty: f64,
    /// Penalty for tokens already present.
    pub presence_penalty: f64,
    /// Stream replies as they are generated.
    pub stream: bool,
    /// Print token statistics after each reply.
    pub print_stats: bool,
    /// API credential.
    pub authorization_key: String,
    /// Instructions sent first in every request.
    pub system_message: String,
    /// The most recent prompt, for re-entry.
    pub last_user_message: String,
    /// User-defined run modes: name to system message.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub run_modes: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_url: DEFAULT_API_URL.to_string(),
            azure_api_version: "2023-05-15".to_string(),
            model: "gpt-4".to_string(),
            tokenizer_model: None,
            temperature: 0.5,
            max_tokens: 2000,
            max_total_tokens: 8192,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: true,
            print_stats: true,
            authorization_key: String::new(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            last_user_message: String::new(),
            run_modes: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Read and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// Load the config at `path`, falling back to defaults.
    ///
    /// A missing or undecodable file is replaced by [`Config::default`], which
    /// is written back so the user has something to edit. A file that decodes
    /// but holds out-of-range values keeps everything else: only the offending
    /// fields are reset, and the repaired file is saved. Other I/O errors are
    /// returned without touching the file.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match Self::read(path) {
            Ok(config) => config,
            Err(err) if is_replaceable(&err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to load config, using defaults"
                );
                let config = Self::default();
                config.save(path)?;
                return Ok(config);
            }
            Err(err) => return Err(err),
        };

        let reset = config.repair();
        if reset.is_empty() {
            tracing::debug!(path = %path.display(), "config loaded");
        } else {
            tracing::warn!(
                path = %path.display(),
                reset = ?reset,
                "config values out of range, reset to defaults"
            );
            config.save(path)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reset every field that breaks an invariant to its default.
    ///
    /// Returns the keys that were reset.
    fn repair(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut reset = Vec::new();
        if self.model.trim().is_empty() {
            self.model = defaults.model;
            reset.push("model");
        }
        if self.max_tokens == 0 || self.max_tokens >= self.max_total_tokens {
            self.max_tokens = defaults.max_tokens;
            reset.push("max_tokens");
            if self.max_tokens >= self.max_total_tokens {
                self.max_total_tokens = defaults.max_total_tokens;
                reset.push("max_total_tokens");
            }
        }
        let ranged: [(&'static str, &mut f64, f64, f64, f64); 4] = [
            ("temperature", &mut self.temperature, defaults.temperature, 0.0, 2.0),
            ("top_p", &mut self.top_p, defaults.top_p, 0.0, 1.0),
            (
                "frequency_penalty",
                &mut self.frequency_penalty,
                defaults.frequency_penalty,
                -2.0,
                2.0,
            ),
            (
                "presence_penalty",
                &mut self.presence_penalty,
                defaults.presence_penalty,
                -2.0,
                2.0,
            ),
        ];
        for (key, value, default, min, max) in ranged {
            if settings::check_range(key, *value, min, max).is_err() {
                *value = default;
                reset.push(key);
            }
        }
        reset
    }

    /// Write the config as pretty JSON.
    ///
    /// The file is written to a temporary sibling and renamed over `path`, so
    /// readers never see a half-written config.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| ConfigError::Io(e.error))?;

        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Check the invariants individual settings cannot check alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(invalid("model", "must not be empty"));
        }
        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", "must be greater than zero"));
        }
        if self.max_tokens >= self.max_total_tokens {
            return Err(invalid(
                "max_tokens",
                format!(
                    "must be less than max_total_tokens ({})",
                    self.max_total_tokens
                ),
            ));
        }
        settings::check_range("temperature", self.temperature, 0.0, 2.0)?;
        settings::check_range("top_p", self.top_p, 0.0, 1.0)?;
        settings::check_range("frequency_penalty", self.frequency_penalty, -2.0, 2.0)?;
        settings::check_range("presence_penalty", self.presence_penalty, -2.0, 2.0)?;
        Ok(())
    }

    /// Set one value by key, parsing and validating it.
    ///
    /// The config is left unchanged if the value is rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let setting = settings::find(key).ok_or_else(|| ConfigError::UnknownSetting(key.into()))?;
        let mut updated = self.clone();
        (setting.apply)(&mut updated, value.trim()).map_err(|reason| invalid(key, reason))?;
        updated.validate()?;
        *self = updated;
        tracing::debug!(key, "setting updated");
        Ok(())
    }

    /// Render every setting as `key: value`, one per line.
    ///
    /// The API key is masked.
    #[must_use]
    pub fn describe(&self) -> String {
        SETTINGS
            .iter()
            .map(|setting| format!("{}: {}", setting.key, (setting.show)(self)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The model name used to pick a tokenizer.
    #[must_use]
    pub fn tokenizer(&self) -> &str {
        self.tokenizer_model.as_deref().unwrap_or(&self.model)
    }
}

// Only a missing or undecodable file is worth overwriting.
fn is_replaceable(err: &ConfigError) -> bool {
    match err {
        ConfigError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
        ConfigError::Serialization(_) => true,
        _ => false,
    }
}

pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}
