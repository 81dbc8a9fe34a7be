//! Token counting for prompts, history entries and streamed replies.

use std::fmt;
use std::sync::Arc;

use termgpt_types::TokenError;
use tiktoken_rs::CoreBPE;

/// Tokenizer name that selects [`RatioCounter`] instead of a real encoding.
pub const ESTIMATE_TOKENIZER: &str = "estimate";

/// Measures text in model tokens.
///
/// Implementations must be deterministic and free of side effects: the same
/// text always yields the same count.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> usize;
}

/// Exact token counts using the model's BPE encoding.
///
/// Special-token markers in the text are encoded as ordinary text.
///
/// # Example
///
/// ```
/// use termgpt_context::{TiktokenCounter, TokenCounter};
///
/// let counter = TiktokenCounter::for_model("gpt-4").unwrap();
/// assert_eq!(counter.count(""), 0);
/// assert!(counter.count("Hello, world!") > 0);
/// ```
#[derive(Clone)]
pub struct TiktokenCounter {
    model: String,
    bpe: Arc<CoreBPE>,
}

impl TiktokenCounter {
    /// Resolve the encoding for `model`.
    ///
    /// Fails with [`TokenError::EncodingUnavailable`] when the model name is
    /// not one tiktoken knows.
    pub fn for_model(model: &str) -> Result<Self, TokenError> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|_| {
            TokenError::EncodingUnavailable {
                model: model.to_string(),
            }
        })?;
        Ok(Self {
            model: model.to_string(),
            bpe: Arc::new(bpe),
        })
    }

    /// The model this counter was resolved for.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Estimates token counts from text length using a chars-per-token ratio.
///
/// A heuristic for backends without a known encoding. The default ratio of
/// 4.0 chars/token approximates GPT-family models.
#[derive(Debug, Clone, Copy)]
pub struct RatioCounter {
    chars_per_token: f32,
}

impl Default for RatioCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl RatioCounter {
    /// Creates a counter with the default ratio of 4.0 chars/token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chars_per_token: 4.0,
        }
    }

    /// Creates a counter with a custom chars-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: f32) -> Self {
        Self { chars_per_token }
    }
}

impl TokenCounter for RatioCounter {
    fn count(&self, text: &str) -> usize {
        (text.len() as f32 / self.chars_per_token).ceil() as usize
    }
}

/// Count the tokens of `text` for `model`.
///
/// Resolves the encoding on every call; hold a [`TiktokenCounter`] when
/// counting repeatedly.
pub fn count_tokens(text: &str, model: &str) -> Result<usize, TokenError> {
    Ok(TiktokenCounter::for_model(model)?.count(text))
}

/// Pick a counter for a tokenizer name.
///
/// [`ESTIMATE_TOKENIZER`] selects [`RatioCounter`]; anything else must be a
/// model name with a known encoding.
pub fn resolve_counter(tokenizer: &str) -> Result<Arc<dyn TokenCounter>, TokenError> {
    if tokenizer == ESTIMATE_TOKENIZER {
        return Ok(Arc::new(RatioCounter::new()));
    }
    Ok(Arc::new(TiktokenCounter::for_model(tokenizer)?))
}
