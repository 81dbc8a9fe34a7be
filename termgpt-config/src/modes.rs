//! Run modes: named presets that replace the system message.

use termgpt_types::ConfigError;

use crate::config::{Config, DEFAULT_SYSTEM_MESSAGE};

/// A built-in run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMode {
    /// Name used with `--mode`.
    pub name: &'static str,
    /// The system message the mode sends.
    pub system_message: &'static str,
}

/// Presets available without any configuration.
pub const BUILTIN_MODES: &[RunMode] = &[
    RunMode {
        name: "default",
        system_message: DEFAULT_SYSTEM_MESSAGE,
    },
    RunMode {
        name: "code",
        system_message: "You are a senior software engineer. Answer with working code first and keep any explanation short. Point out bugs you notice in code the user shows you.",
    },
    RunMode {
        name: "shell",
        system_message: "You are a terminal expert. Reply with the shell command that does what the user asks, followed by at most one sentence explaining it. Prefer portable POSIX commands.",
    },
];

impl Config {
    /// The system message for run mode `name`.
    ///
    /// Modes defined in `run_modes` shadow built-ins of the same name.
    pub fn run_mode(&self, name: &str) -> Result<&str, ConfigError> {
        if let Some(message) = self.run_modes.get(name) {
            return Ok(message.as_str());
        }
        BUILTIN_MODES
            .iter()
            .find(|mode| mode.name == name)
            .map(|mode| mode.system_message)
            .ok_or_else(|| ConfigError::UnknownRunMode(name.to_string()))
    }

    /// Replace `system_message` with the preset for run mode `name`.
    pub fn apply_run_mode(&mut self, name: &str) -> Result<(), ConfigError> {
        let message = self.run_mode(name)?.to_string();
        tracing::debug!(mode = name, "run mode applied");
        self.system_message = message;
        Ok(())
    }

    /// Names of all run modes, built-in and user-defined, sorted.
    #[must_use]
    pub fn run_mode_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = BUILTIN_MODES
            .iter()
            .map(|mode| mode.name)
            .chain(self.run_modes.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
