#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
