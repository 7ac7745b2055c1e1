use thiserror::Error;

use crate::builder::ContextKind;

/// Boxed error type used to carry transport failures through the stream.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Terminal failure of a decoder or encoder stream.
///
/// Exactly one `Error` (or a completion) is ever delivered per stream.
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not lexically valid JSON.
    #[error("syntax error: {source} at {line}:{column}")]
    Syntax {
        /// What the tokenizer rejected.
        source: SyntaxError,
        /// Line of the offending byte, starting at 1.
        line: usize,
        /// Column of the offending byte, starting at 1.
        column: usize,
    },
    /// A token arrived in a context that cannot accept it.
    #[error("parse state error: {source} at {line}:{column} near '{near}'")]
    ParseState {
        /// What the tree builder rejected.
        source: ParseStateError,
        /// Line just past the rejected token, starting at 1.
        line: usize,
        /// Column just past the rejected token, starting at 1.
        column: usize,
        /// Input surrounding the failure, lossily decoded.
        near: String,
    },
    /// A failure reported by the upstream source, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// An item could not be written as JSON.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// `request(0)` was signalled on a subscription.
    #[error("demand must be positive")]
    InvalidDemand,
}

impl Error {
    /// Wraps an arbitrary upstream failure.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transport(error.into())
    }

    /// Returns `true` for errors raised by the tree builder.
    #[must_use]
    pub fn is_parse_state(&self) -> bool {
        matches!(self, Self::ParseState { .. })
    }

    /// Returns `true` for errors raised by the tokenizer.
    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}

/// Lexical errors reported by the [`Tokenizer`](crate::Tokenizer).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// A character that cannot start or continue a token here.
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    /// A byte that is not valid outside a string.
    #[error("invalid byte 0x{0:02X}")]
    InvalidByte(u8),
    /// A non-hex digit inside a `\u` escape.
    #[error("invalid unicode escape sequence at character: '{0}'")]
    InvalidUnicodeEscapeChar(char),
    /// A `\u` escape naming no scalar value, such as a lone surrogate.
    #[error("invalid unicode escape sequence \\u{0:X}")]
    InvalidUnicodeEscapeSequence(u32),
    /// A string's bytes are not valid UTF-8.
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,
    /// Input was closed in the middle of a token.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
}

/// Token sequences that are lexically valid but cannot be assembled into a
/// tree from the builder's current context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseStateError {
    /// `token` cannot appear in `context`.
    #[error("unexpected token {token} in {context} context")]
    UnexpectedToken {
        /// The rejected token, as displayed by the tokenizer.
        token: String,
        /// The innermost open context.
        context: ContextKind,
    },
    /// Input ended while `context` was still open.
    #[error("input ended inside {context} context")]
    PrematureEnd {
        /// The innermost open context.
        context: ContextKind,
    },
}
