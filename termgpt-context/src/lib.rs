#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod counter;
pub mod window;

pub use counter::{
    ESTIMATE_TOKENIZER, RatioCounter, TiktokenCounter, TokenCounter, count_tokens,
    resolve_counter,
};
pub use window::{BudgetWindow, Window, WindowBudget, build_window};
