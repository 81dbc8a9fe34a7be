#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod client;
pub(crate) mod error;
pub mod streaming;
pub mod types;

pub use client::{Backend, ChatClient};
pub use streaming::{ReaderState, StreamReader};
pub use types::{ChatRequest, CompletionParams};

pub use termgpt_types::{ProviderError, Reply};
