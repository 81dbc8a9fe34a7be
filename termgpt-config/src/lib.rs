#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod config;
pub mod modes;
pub mod settings;

pub use config::{Config, DEFAULT_API_URL, DEFAULT_SYSTEM_MESSAGE, ProviderKind};
pub use modes::{BUILTIN_MODES, RunMode};
pub use settings::{SETTINGS, Setting, mask_key, settings_help};
