//! Declarative settings schema.
//!
//! Each [`Setting`] knows how to parse one string value into the config and
//! how to render the current value. [`Config::set`] and [`Config::describe`]
//! are driven entirely by [`SETTINGS`].

use std::str::FromStr;

use termgpt_types::ConfigError;

use crate::config::{Config, ProviderKind, invalid};

/// One user-settable configuration value.
pub struct Setting {
    /// Key used on the command line and in the config file.
    pub key: &'static str,
    /// One-line description.
    pub help: &'static str,
    /// Parse `value` and store it, or explain why it was rejected.
    pub apply: fn(&mut Config, &str) -> Result<(), String>,
    /// Render the current value for display.
    pub show: fn(&Config) -> String,
}

impl std::fmt::Debug for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setting").field("key", &self.key).finish_non_exhaustive()
    }
}

/// Every setting, in display order.
pub static SETTINGS: &[Setting] = &[
    Setting {
        key: "provider",
        help: "completion API flavour: openai or azure",
        apply: |c, v| {
            c.provider = match v.to_ascii_lowercase().as_str() {
                "openai" => ProviderKind::OpenAi,
                "azure" => ProviderKind::Azure,
                other => return Err(format!("expected openai or azure, got {other:?}")),
            };
            Ok(())
        },
        show: |c| c.provider.as_str().to_string(),
    },
    Setting {
        key: "api_url",
        help: "chat completions endpoint, or the Azure resource endpoint",
        apply: |c, v| {
            c.api_url = parse_url(v)?;
            Ok(())
        },
        show: |c| c.api_url.clone(),
    },
    Setting {
        key: "azure_api_version",
        help: "api-version sent to Azure",
        apply: |c, v| {
            c.azure_api_version = non_empty(v)?;
            Ok(())
        },
        show: |c| c.azure_api_version.clone(),
    },
    Setting {
        key: "model",
        help: "model name (deployment name on Azure)",
        apply: |c, v| {
            c.model = non_empty(v)?;
            Ok(())
        },
        show: |c| c.model.clone(),
    },
    Setting {
        key: "tokenizer_model",
        help: "model whose tokenizer counts tokens; empty to use model, \"estimate\" to approximate",
        apply: |c, v| {
            c.tokenizer_model = (!v.is_empty()).then(|| v.to_string());
            Ok(())
        },
        show: |c| c.tokenizer().to_string(),
    },
    Setting {
        key: "temperature",
        help: "sampling temperature, 0 to 2",
        apply: |c, v| {
            c.temperature = parse_in(v, 0.0, 2.0)?;
            Ok(())
        },
        show: |c| c.temperature.to_string(),
    },
    Setting {
        key: "max_tokens",
        help: "tokens reserved for the reply",
        apply: |c, v| {
            c.max_tokens = parse_positive(v)?;
            Ok(())
        },
        show: |c| c.max_tokens.to_string(),
    },
    Setting {
        key: "max_total_tokens",
        help: "model context size, prompt plus reply",
        apply: |c, v| {
            c.max_total_tokens = parse_positive(v)?;
            Ok(())
        },
        show: |c| c.max_total_tokens.to_string(),
    },
    Setting {
        key: "top_p",
        help: "nucleus sampling mass, 0 to 1",
        apply: |c, v| {
            c.top_p = parse_in(v, 0.0, 1.0)?;
            Ok(())
        },
        show: |c| c.top_p.to_string(),
    },
    Setting {
        key: "frequency_penalty",
        help: "penalty for frequent tokens, -2 to 2",
        apply: |c, v| {
            c.frequency_penalty = parse_in(v, -2.0, 2.0)?;
            Ok(())
        },
        show: |c| c.frequency_penalty.to_string(),
    },
    Setting {
        key: "presence_penalty",
        help: "penalty for tokens already present, -2 to 2",
        apply: |c, v| {
            c.presence_penalty = parse_in(v, -2.0, 2.0)?;
            Ok(())
        },
        show: |c| c.presence_penalty.to_string(),
    },
    Setting {
        key: "stream",
        help: "stream replies as they are generated",
        apply: |c, v| {
            c.stream = parse_bool(v)?;
            Ok(())
        },
        show: |c| c.stream.to_string(),
    },
    Setting {
        key: "print_stats",
        help: "print token statistics after each reply",
        apply: |c, v| {
            c.print_stats = parse_bool(v)?;
            Ok(())
        },
        show: |c| c.print_stats.to_string(),
    },
    Setting {
        key: "authorization_key",
        help: "API key",
        apply: |c, v| {
            c.authorization_key = non_empty(v)?;
            Ok(())
        },
        show: |c| mask_key(&c.authorization_key),
    },
    Setting {
        key: "system_message",
        help: "instructions sent first in every request",
        apply: |c, v| {
            c.system_message = non_empty(v)?;
            Ok(())
        },
        show: |c| c.system_message.clone(),
    },
];

/// Look a setting up by key.
pub fn find(key: &str) -> Option<&'static Setting> {
    SETTINGS.iter().find(|s| s.key == key)
}

/// Render every setting key with its description, one per line.
#[must_use]
pub fn settings_help() -> String {
    let width = SETTINGS.iter().map(|s| s.key.len()).max().unwrap_or(0);
    SETTINGS
        .iter()
        .map(|s| format!("{:width$}  {}", s.key, s.help))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn check_range(key: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, format!("{value} is outside {min}..={max}")))
    }
}

fn parse<T: FromStr>(value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| format!("{value:?}: {e}"))
}

fn parse_in(value: &str, min: f64, max: f64) -> Result<f64, String> {
    let parsed: f64 = parse(value)?;
    if !(min..=max).contains(&parsed) {
        return Err(format!("{parsed} is outside {min}..={max}"));
    }
    Ok(parsed)
}

fn parse_positive(value: &str) -> Result<u32, String> {
    match parse::<u32>(value)? {
        0 => Err("must be greater than zero".into()),
        n => Ok(n),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "no" | "n" | "off" | "0" => Ok(false),
        other => Err(format!("expected true or false, got {other:?}")),
    }
}

fn non_empty(value: &str) -> Result<String, String> {
    if value.is_empty() {
        Err("must not be empty".into())
    } else {
        Ok(value.to_string())
    }
}

fn parse_url(value: &str) -> Result<String, String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(format!("{value:?} is not an http(s) URL"))
    }
}

/// Hide all but the last four characters of a credential.
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "(unset)".into();
    }
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{tail}")
}
