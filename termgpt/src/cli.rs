//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use termgpt_config::Config;
use termgpt_types::ConfigError;

/// Words that end an interactive session.
pub const EXIT_WORDS: &[&str] = &["e", "exit", "quit"];

/// Chat with an OpenAI or Azure OpenAI model from the terminal.
///
/// With a prompt, sends it once and exits. Without one, reads prompts from
/// stdin until `e`, `exit` or end of input.
#[derive(Debug, Parser)]
#[command(name = "termgpt", version, about)]
pub struct Args {
    /// Prompt to send; omit for an interactive session.
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,

    /// Config file (default: <config dir>/termgpt/config.json).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// History file (default: <config dir>/termgpt/history.json).
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Delete the conversation history before doing anything else.
    #[arg(long)]
    pub clear: bool,

    /// Run mode whose system message replaces the configured one.
    #[arg(short, long, value_name = "NAME")]
    pub mode: Option<String>,

    /// Change a setting and save it, e.g. `--set temperature=0.2`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Make run mode NAME the saved system message.
    #[arg(long, value_name = "NAME")]
    pub save_mode: Option<String>,

    /// Print the current settings and exit.
    #[arg(long)]
    pub show_config: bool,

    /// Describe every setting `--set` accepts and exit.
    #[arg(long)]
    pub list_settings: bool,

    /// List run modes and exit.
    #[arg(long)]
    pub list_modes: bool,

    /// Resend the last prompt.
    #[arg(long, conflicts_with = "prompt")]
    pub again: bool,

    /// More logging on stderr (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// The positional words joined into one prompt, if any were given.
    pub fn prompt(&self) -> Option<String> {
        let joined = self.prompt.join(" ");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Default log filter for the chosen verbosity.
    ///
    /// `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Apply `--set` and `--save-mode` to `config`.
    ///
    /// Returns whether anything changed. On error `config` may hold the
    /// assignments that came before the rejected one, so it must not be saved.
    pub fn apply_config_changes(&self, config: &mut Config) -> Result<bool, ConfigError> {
        for (key, value) in &self.set {
            config.set(key, value)?;
        }
        if let Some(mode) = &self.save_mode {
            config.apply_run_mode(mode)?;
        }
        Ok(!self.set.is_empty() || self.save_mode.is_some())
    }

    /// Config path from the flag, else the per-user default.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| data_dir().join("config.json"))
    }

    /// History path from the flag, else the per-user default.
    pub fn history_path(&self) -> PathBuf {
        self.history
            .clone()
            .unwrap_or_else(|| data_dir().join("history.json"))
    }
}

fn data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("termgpt")
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_assignment(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {input:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {input:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Whether an interactive input line ends the session.
pub fn is_exit(line: &str) -> bool {
    EXIT_WORDS.contains(&line.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn prompt_words_are_joined() {
        let args = Args::parse_from(["termgpt", "how", "do", "I", "tar", "a", "dir"]);
        assert_eq!(args.prompt().as_deref(), Some("how do I tar a dir"));
    }

    #[test]
    fn no_prompt_means_interactive() {
        let args = Args::parse_from(["termgpt"]);
        assert_eq!(args.prompt(), None);
        assert_eq!(args.log_filter(), "warn");
    }

    #[test]
    fn repeated_set_flags() {
        let args = Args::parse_from([
            "termgpt",
            "--set",
            "temperature=0.2",
            "--set",
            "system_message=a=b",
        ]);
        assert_eq!(
            args.set,
            vec![
                ("temperature".to_string(), "0.2".to_string()),
                ("system_message".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn bad_assignment_rejected() {
        assert!(parse_assignment("temperature").is_err());
        assert!(parse_assignment("=1").is_err());
        assert_eq!(
            parse_assignment("tokenizer_model="),
            Ok(("tokenizer_model".into(), String::new()))
        );
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(Args::parse_from(["termgpt", "-v"]).log_filter(), "debug");
        assert_eq!(Args::parse_from(["termgpt", "-vv"]).log_filter(), "trace");
    }

    #[test]
    fn again_conflicts_with_prompt() {
        assert!(Args::try_parse_from(["termgpt", "--again", "hello"]).is_err());
    }

    #[test]
    fn explicit_paths_win() {
        let args = Args::parse_from(["termgpt", "--config", "/tmp/c.json", "--history", "/tmp/h.json"]);
        assert_eq!(args.config_path(), PathBuf::from("/tmp/c.json"));
        assert_eq!(args.history_path(), PathBuf::from("/tmp/h.json"));
    }

    #[test]
    fn config_changes_apply_in_order() {
        let args = Args::parse_from([
            "termgpt",
            "--set",
            "temperature=0.2",
            "--save-mode",
            "shell",
        ]);
        let mut config = Config::default();
        assert!(args.apply_config_changes(&mut config).unwrap());
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.system_message, config.run_mode("shell").unwrap());
    }

    #[test]
    fn no_config_changes_without_flags() {
        let args = Args::parse_from(["termgpt", "hello"]);
        let mut config = Config::default();
        assert!(!args.apply_config_changes(&mut config).unwrap());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_saved_mode_is_rejected() {
        let args = Args::parse_from(["termgpt", "--save-mode", "poetry"]);
        let err = args.apply_config_changes(&mut Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRunMode(ref m) if m == "poetry"));
    }

    #[test]
    fn exit_words() {
        assert!(is_exit("e"));
        assert!(is_exit(" exit \n"));
        assert!(!is_exit("explain"));
    }
}
