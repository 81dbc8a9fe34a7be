//! Incremental reader for streamed chat completions.
//!
//! The body is a server-sent event stream:
//!
//! ```text
//! data: {"choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}
//!
//! data: {"choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":null}]}
//!
//! data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}
//!
//! data: [DONE]
//! ```
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat/streaming>

use bytes::Bytes;
use futures::{Stream, StreamExt};
use termgpt_context::TokenCounter;
use termgpt_types::{ProviderError, Reply, TokenUsage};

use crate::error::map_reqwest_error;
use crate::types::ChunkEvent;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Where a [`StreamReader`] is in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Waiting for the next complete line.
    AwaitingLine,
    /// Decoding the payload of a `data:` line.
    ParsingEvent,
    /// Folding a decoded event into the reply.
    Accumulating,
    /// The sentinel or a finish reason was seen; further input is ignored.
    Done,
}

/// Accumulates a streamed reply from raw body bytes.
///
/// Feed it chunks as they arrive with [`StreamReader::feed`], then call
/// [`StreamReader::finish`]. Each content delta is counted and handed to the
/// caller's callback as soon as its line is complete.
///
/// # Example
///
/// ```
/// use termgpt_context::RatioCounter;
/// use termgpt_provider_openai::StreamReader;
///
/// let counter = RatioCounter::new();
/// let mut reader = StreamReader::new(&counter);
/// let mut shown = String::new();
/// let mut show = |delta: &str| shown.push_str(delta);
///
/// reader
///     .feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n", &mut show)
///     .unwrap();
/// let reply = reader.finish(&mut show).unwrap();
/// assert_eq!(reply.text, "Hi");
/// assert_eq!(shown, "Hi");
/// ```
pub struct StreamReader<'a> {
    counter: &'a dyn TokenCounter,
    state: ReaderState,
    line_buf: Vec<u8>,
    text: String,
    chunk_tokens: usize,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
}

impl<'a> StreamReader<'a> {
    /// Creates a reader that measures deltas with `counter`.
    pub fn new(counter: &'a dyn TokenCounter) -> Self {
        Self {
            counter,
            state: ReaderState::AwaitingLine,
            line_buf: Vec::new(),
            text: String::new(),
            chunk_tokens: 0,
            finish_reason: None,
            usage: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Whether the stream has ended and no more input is needed.
    pub fn is_done(&self) -> bool {
        self.state == ReaderState::Done
    }

    /// Consume a chunk of body bytes.
    ///
    /// Chunks may split lines, and multi-byte characters, anywhere; incomplete
    /// lines are buffered until the rest arrives.
    pub fn feed(
        &mut self,
        chunk: &[u8],
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), ProviderError> {
        if self.is_done() {
            return Ok(());
        }
        self.line_buf.extend_from_slice(chunk);
        while let Some(pos) = self.line_buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.line_buf.drain(..=pos).collect();
            let line = decode_line(&raw[..pos])?;
            self.process_line(line, on_delta)?;
            if self.is_done() {
                self.line_buf.clear();
                break;
            }
        }
        Ok(())
    }

    /// Handle one complete line (without its line terminator).
    pub fn process_line(
        &mut self,
        line: &str,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), ProviderError> {
        if self.is_done() {
            return Ok(());
        }
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            // Blank separators, comments and `event:` lines carry nothing.
            return Ok(());
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload).trim_end();
        if payload == DONE_SENTINEL {
            self.state = ReaderState::Done;
            return Ok(());
        }

        self.state = ReaderState::ParsingEvent;
        let event: ChunkEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                self.state = ReaderState::Done;
                return Err(ProviderError::Decode(format!("invalid stream event: {e}")));
            }
        };
        if let Some(error) = event.error {
            self.state = ReaderState::Done;
            return Err(ProviderError::StreamError(error.message().to_string()));
        }

        self.state = ReaderState::Accumulating;
        if event.usage.is_some() {
            self.usage = event.usage;
        }
        let mut finished = false;
        if let Some(choice) = event.choices.into_iter().find(|c| c.index == 0) {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.chunk_tokens += self.counter.count(&content);
                self.text.push_str(&content);
                on_delta(&content);
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
                finished = true;
            }
        }

        self.state = if finished {
            ReaderState::Done
        } else {
            ReaderState::AwaitingLine
        };
        Ok(())
    }

    /// Flush any unterminated last line and produce the reply.
    ///
    /// A body that ends without the sentinel or a finish reason is treated as
    /// a clean end of stream.
    pub fn finish(mut self, on_delta: &mut dyn FnMut(&str)) -> Result<Reply, ProviderError> {
        if !self.is_done() && !self.line_buf.is_empty() {
            let rest = std::mem::take(&mut self.line_buf);
            let line = decode_line(&rest)?;
            self.process_line(line, on_delta)?;
        }
        let response_tokens = self.counter.count(&self.text);
        tracing::debug!(
            response_tokens,
            chunk_tokens = self.chunk_tokens,
            finish_reason = ?self.finish_reason,
            "stream finished"
        );
        Ok(Reply {
            text: self.text,
            response_tokens,
            chunk_tokens: self.chunk_tokens,
            finish_reason: self.finish_reason,
            usage: self.usage,
        })
    }
}

fn decode_line(raw: &[u8]) -> Result<&str, ProviderError> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| ProviderError::Decode(format!("stream is not valid UTF-8: {e}")))?;
    Ok(line.trim_end_matches('\r'))
}

/// Drive a [`StreamReader`] over an HTTP body until the stream ends.
///
/// Stops reading as soon as the reply is complete. A transport error aborts
/// the whole call.
pub(crate) async fn read_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>>,
    counter: &dyn TokenCounter,
    on_delta: &mut dyn FnMut(&str),
) -> Result<Reply, ProviderError> {
    let mut reader = StreamReader::new(counter);
    let mut byte_stream = std::pin::pin!(byte_stream);
    while !reader.is_done() {
        match byte_stream.next().await {
            Some(Ok(chunk)) => reader.feed(&chunk, on_delta)?,
            Some(Err(e)) => return Err(map_reqwest_error(e)),
            None => break,
        }
    }
    reader.finish(on_delta)
}
