//! Chunked bytes in, JSON values out.
//!
//! A [`Decoder`] subscribes to a [`Publisher`] of byte chunks and publishes
//! the [`Value`]s found in them. Downstream demand bounds how many values are
//! emitted; upstream chunks are requested only to make progress towards the
//! next value (or, with prefetching, in fixed batches ahead of need).
//!
//! ```
//! use bytes::Bytes;
//! use futures::{StreamExt, executor::block_on};
//! use jsonflow::{decode, flow::{from_iter, into_stream}};
//!
//! let chunks = [r#"[{"x":1},{"#, r#""x":2}]"#].map(Bytes::from);
//! let values: Vec<String> = block_on(
//!     into_stream(decode(from_iter(chunks)).ignore_level(1), 16)
//!         .map(|value| value.unwrap().to_string())
//!         .collect(),
//! );
//! assert_eq!(values, [r#"{"x":1}"#, r#"{"x":2}"#]);
//! ```

mod non_prefetching;
mod prefetching;
mod shared;

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    DecoderOptions, Error, Token, Tokenizer, TreeBuilder, Value,
    flow::{Publisher, Subscriber},
};

/// A [`Publisher`] of the values decoded from a publisher of byte chunks.
///
/// Created by [`decode`] or [`Decoder::with_options`].
#[derive(Debug)]
pub struct Decoder<P> {
    source: P,
    options: DecoderOptions,
}

/// Decodes the JSON values in `source` with default options.
pub fn decode<P>(source: P) -> Decoder<P>
where
    P: Publisher<Bytes>,
{
    Decoder::with_options(source, DecoderOptions::default())
}

impl<P> Decoder<P>
where
    P: Publisher<Bytes>,
{
    /// Creates a decoder with explicit options.
    pub fn with_options(source: P, options: DecoderOptions) -> Self {
        Self { source, options }
    }

    /// Unwraps `level` outer containers. See [`DecoderOptions::ignore_level`].
    #[must_use]
    pub fn ignore_level(mut self, level: usize) -> Self {
        self.options.ignore_level = level;
        self
    }

    /// Requests chunks in batches of `batch`. See [`DecoderOptions::prefetch`].
    #[must_use]
    pub fn prefetch(mut self, batch: usize) -> Self {
        self.options.prefetch = Some(batch);
        self
    }

    /// The options this decoder will run with.
    #[must_use]
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }
}

impl<P> Publisher<Value> for Decoder<P>
where
    P: Publisher<Bytes>,
{
    fn subscribe(self, subscriber: Arc<dyn Subscriber<Value>>) {
        let ignore_level = self.options.ignore_level;
        match self.options.prefetch_batch() {
            None => shared::Adapter::start(
                self.source,
                subscriber,
                ignore_level,
                non_prefetching::NonPrefetching::default(),
            ),
            Some(batch) => shared::Adapter::start(
                self.source,
                subscriber,
                ignore_level,
                prefetching::Prefetching::new(batch),
            ),
        }
    }
}

/// Outcome of one [`DecodeState::advance`].
#[derive(Debug)]
pub(crate) enum Step {
    /// A root value completed.
    Value(Value),
    /// The tokenizer needs more input.
    Starved,
    /// Input ended cleanly between root values.
    Finished,
}

/// Tokenizer and builder of one decoding stream.
#[derive(Debug)]
pub(crate) struct DecodeState {
    tokenizer: Tokenizer,
    builder: TreeBuilder,
    /// A completed value waiting for demand.
    ready: Option<Value>,
}

impl DecodeState {
    pub(crate) fn new(ignore_level: usize) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            builder: TreeBuilder::new(ignore_level),
            ready: None,
        }
    }

    pub(crate) fn feed(&mut self, chunk: &[u8]) {
        self.tokenizer.feed(chunk);
    }

    pub(crate) fn end_of_input(&mut self) {
        self.tokenizer.end_of_input();
    }

    pub(crate) fn park(&mut self, value: Value) {
        debug_assert!(self.ready.is_none());
        self.ready = Some(value);
    }

    pub(crate) fn has_ready(&self) -> bool {
        self.ready.is_some()
    }

    pub(crate) fn take_ready(&mut self) -> Option<Value> {
        self.ready.take()
    }

    /// Releases buffers once the stream has terminated.
    pub(crate) fn clear(&mut self) {
        self.tokenizer.clear();
        self.builder = TreeBuilder::default();
        self.ready = None;
    }

    /// Runs tokens through the builder until a value completes or the
    /// tokenizer runs dry.
    pub(crate) fn advance(&mut self) -> Result<Step, Error> {
        if let Some(value) = self.ready.take() {
            return Ok(Step::Value(value));
        }
        loop {
            let token = self.tokenizer.next_token()?;
            let end = match token {
                Token::NotAvailable => return Ok(Step::Starved),
                Token::EndOfInput => true,
                _ => false,
            };
            match self.builder.parse_token(token) {
                Ok(Some(value)) => return Ok(Step::Value(value)),
                Ok(None) if end => return Ok(Step::Finished),
                Ok(None) => {}
                Err(source) => {
                    let (line, column) = self.tokenizer.position();
                    return Err(Error::ParseState {
                        source,
                        line,
                        column,
                        near: self.tokenizer.near(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseStateError;

    fn run(chunks: &[&[u8]], ignore_level: usize) -> Result<Vec<String>, Error> {
        let mut state = DecodeState::new(ignore_level);
        let mut out = Vec::new();
        let mut chunks = chunks.iter();
        loop {
            match state.advance()? {
                Step::Value(value) => out.push(value.to_string()),
                Step::Finished => return Ok(out),
                Step::Starved => match chunks.next() {
                    Some(chunk) => state.feed(chunk),
                    None => state.end_of_input(),
                },
            }
        }
    }

    #[test]
    fn concatenated_root_values() {
        let values = run(&[br#"{"a":1}{"b"#, br#"":2}"#], 0).unwrap();
        assert_eq!(values, [r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn parked_value_is_returned_first() {
        let mut state = DecodeState::new(0);
        state.feed(b"[1][2]");
        let Ok(Step::Value(first)) = state.advance() else {
            panic!("expected a value");
        };
        state.park(first.clone());
        assert!(state.has_ready());
        assert!(matches!(state.advance(), Ok(Step::Value(v)) if v == first));
        assert!(matches!(state.advance(), Ok(Step::Value(v)) if v.to_string() == "[2]"));
        assert!(matches!(state.advance(), Ok(Step::Starved)));
    }

    #[test]
    fn premature_end_is_reported_with_position() {
        let err = run(&[br#"{"a":1"#], 0).unwrap_err();
        let Error::ParseState { source, line, column, .. } = err else {
            panic!("unexpected error {err}");
        };
        assert_eq!(
            source,
            ParseStateError::PrematureEnd {
                context: crate::ContextKind::RootObject
            }
        );
        assert_eq!((line, column), (1, 7));
    }

    #[test]
    fn parse_state_error_carries_nearby_text() {
        let err = run(&[br#"[{"a":1}]"#], 2).unwrap_err();
        assert!(err.is_parse_state());
        assert!(err.to_string().contains(r#"near '[{"a":1}]'"#), "{err}");
    }
}
