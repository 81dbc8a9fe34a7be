#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod cli;
pub mod error;
pub mod session;

pub use error::ChatError;
pub use session::ChatSession;
pub use termgpt_types::TurnStats;
