//! Non-blocking JSON codec over chunked byte streams.
//!
//! Decoding turns a [`Publisher`](flow::Publisher) of byte chunks into a
//! publisher of [`Value`]s. Chunks may split the input anywhere, including
//! inside a string, an escape sequence or a multi-byte character. Encoding
//! turns a publisher of [`serde::Serialize`] items into the chunks of a
//! single JSON array. Both directions are driven by downstream demand and
//! never block.
//!
//! ```
//! use bytes::Bytes;
//! use futures::{StreamExt, executor::block_on};
//! use jsonflow::{decode, encode, flow::{from_iter, into_stream}};
//!
//! let chunks = [r#"[[1], {"a": 2"#, "0}, [3]]"].map(Bytes::from);
//! let values: Vec<_> = block_on(
//!     into_stream(decode(from_iter(chunks)).ignore_level(1), 8)
//!         .map(Result::unwrap)
//!         .collect(),
//! );
//! let bytes: Vec<Bytes> = block_on(
//!     into_stream(encode(from_iter(values)), 8)
//!         .map(Result::unwrap)
//!         .collect(),
//! );
//! assert_eq!(bytes.concat(), br#"[[1],{"a":20},[3]]"#);
//! ```
//!
//! The lower layers are usable on their own: [`Tokenizer`] turns bytes into
//! [`Token`]s, [`TreeBuilder`] assembles tokens into values, and
//! [`ArrayWriter`] frames serialized items over a [`ChunkSink`].

mod builder;
mod decode;
mod encode;
mod error;
pub mod flow;
mod options;
mod tokenizer;
mod value;

#[cfg(test)]
mod tests;

pub use builder::{ContextKind, TreeBuilder};
pub use decode::{Decoder, decode};
pub use encode::{ArrayWriter, ChunkConsumer, ChunkSink, Encoder, encode};
pub use error::{BoxError, Error, ParseStateError, SyntaxError};
pub use options::{DEFAULT_CHUNK_CAPACITY, DEFAULT_PREFETCH, DecoderOptions, EncoderOptions};
pub use tokenizer::{NumberKind, Token, Tokenizer};
pub use value::{Array, Map, Number, Value};

#[cfg(any(test, feature = "fuzzing"))]
#[doc(hidden)]
pub mod chunk_utils;
