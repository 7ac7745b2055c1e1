//! Non-blocking JSON tokenizer.
//!
//! Overview
//! - [`Tokenizer::feed`] appends a chunk of raw bytes; [`Tokenizer::next_token`]
//!   returns the next complete lexical token, or [`Token::NotAvailable`] when
//!   the buffered bytes end inside (or before) a token. Nothing blocks: the
//!   caller feeds more input and asks again.
//! - Partial tokens survive across chunk boundaries. String bytes and number
//!   digits accumulate in `scratch`, literal and escape progress lives in
//!   small matchers, so the byte that resumes a token can arrive in any later
//!   chunk.
//! - After [`Tokenizer::end_of_input`], trailing numbers are flushed and the
//!   tokenizer reports [`Token::EndOfInput`] once every byte is consumed.
//!
//! The tokenizer checks JSON grammar (commas, colons, bracket matching), so
//! token sequences it emits are always well formed. Whether a container is
//! still open at end of input is left to the [`TreeBuilder`], which reports it
//! as a parse state error.
//!
//! [`TreeBuilder`]: crate::TreeBuilder

mod escape;
mod literal;

use core::fmt;

use bstr::ByteSlice;

use crate::error::{Error, SyntaxError};
use escape::UnicodeEscapeBuffer;
use literal::ExpectedLiteralBuffer;

/// Bytes of context shown on either side of the cursor in diagnostics.
const NEAR_CONTEXT: usize = 16;

/// The representation class of a number literal, as reported by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Integer that fits in `i32`.
    Int,
    /// Integer that fits in `i64`.
    Long,
    /// Integer too large for `i64`.
    BigInteger,
    /// Literal with a fraction or an exponent.
    BigDecimal,
}

impl NumberKind {
    /// Validates a complete number literal and reports its kind.
    ///
    /// Returns `None` unless the whole of `literal` is one JSON number.
    #[must_use]
    pub fn classify(literal: &str) -> Option<Self> {
        let mut tokenizer = Tokenizer::new();
        tokenizer.feed(literal.as_bytes());
        tokenizer.end_of_input();
        match tokenizer.next_token() {
            Ok(Token::ValueNumber { kind, text }) if text == literal => {
                matches!(tokenizer.next_token(), Ok(Token::EndOfInput)).then_some(kind)
            }
            _ => None,
        }
    }

    fn of_integer(text: &str) -> Self {
        if text.parse::<i32>().is_ok() {
            Self::Int
        } else if text.parse::<i64>().is_ok() {
            Self::Long
        } else {
            Self::BigInteger
        }
    }
}

/// Lexical events reported by the [`Tokenizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// An object key, unescaped.
    FieldName(String),
    /// A string value, unescaped.
    ValueString(String),
    /// A number literal, verbatim, with the kind the lexer classified it as.
    ValueNumber {
        /// How the literal was classified.
        kind: NumberKind,
        /// The literal exactly as it appeared in the input.
        text: String,
    },
    /// `true` or `false`.
    ValueBool(bool),
    /// `null`
    ValueNull,
    /// No complete token is available from the bytes fed so far.
    NotAvailable,
    /// Input was closed and every byte has been consumed.
    EndOfInput,
}

impl Token {
    /// Returns `true` for tokens that carry a scalar value.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::ValueString(_) | Self::ValueNumber { .. } | Self::ValueBool(_) | Self::ValueNull
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::StartObject => f.write_str("START_OBJECT"),
            Token::EndObject => f.write_str("END_OBJECT"),
            Token::StartArray => f.write_str("START_ARRAY"),
            Token::EndArray => f.write_str("END_ARRAY"),
            Token::FieldName(name) => write!(f, "FIELD_NAME {name:?}"),
            Token::ValueString(s) => write!(f, "VALUE_STRING {s:?}"),
            Token::ValueNumber { text, .. } => write!(f, "VALUE_NUMBER {text}"),
            Token::ValueBool(b) => write!(f, "VALUE_BOOL {b}"),
            Token::ValueNull => f.write_str("VALUE_NULL"),
            Token::NotAvailable => f.write_str("NOT_AVAILABLE"),
            Token::EndOfInput => f.write_str("END_OF_INPUT"),
        }
    }
}

/// Represents a peeked byte from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peeked {
    /// The buffer is drained but more input may follow.
    Empty,
    Byte(u8),
    /// The buffer is drained and the input is closed.
    EndOfInput,
}

use Peeked::{Byte, Empty, EndOfInput};

/// Where in the document grammar the next token must fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Between root values.
    Root,
    /// After `{`: a field name or `}`.
    BeforePropertyName,
    /// After `,` in an object: a field name only.
    BeforeNextPropertyName,
    AfterPropertyName,
    BeforePropertyValue,
    AfterPropertyValue,
    /// After `[`: a value or `]`.
    BeforeArrayValue,
    /// After `,` in an array: a value only.
    BeforeNextArrayValue,
    AfterArrayValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberState {
    Sign,
    Zero,
    Integer,
    Point,
    Fraction,
    Exponent,
    ExponentSign,
    ExponentInteger,
}

impl NumberState {
    /// States in which the digits read so far form a complete literal.
    fn is_terminal(self) -> bool {
        matches!(self, Self::Zero | Self::Integer | Self::Fraction | Self::ExponentInteger)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Default,
    Literal,
    Number(NumberState),
    String,
    StringEscape,
    StringEscapeUnicode,
}

/// Incremental, non-blocking JSON tokenizer over byte chunks.
///
/// ```
/// use jsonflow::{Token, Tokenizer};
///
/// let mut tokenizer = Tokenizer::new();
/// tokenizer.feed(br#"{"a":tr"#);
/// assert_eq!(tokenizer.next_token().unwrap(), Token::StartObject);
/// assert_eq!(tokenizer.next_token().unwrap(), Token::FieldName("a".into()));
/// assert_eq!(tokenizer.next_token().unwrap(), Token::NotAvailable);
///
/// tokenizer.feed(b"ue}");
/// assert_eq!(tokenizer.next_token().unwrap(), Token::ValueBool(true));
/// assert_eq!(tokenizer.next_token().unwrap(), Token::EndObject);
/// ```
#[derive(Debug)]
pub struct Tokenizer {
    input: Vec<u8>,
    cursor: usize,
    end_of_input: bool,

    line: usize,
    column: usize,

    parse_state: ParseState,
    lex_state: LexState,
    containers: Vec<Container>,

    /// Bytes of the token in flight: decoded string content or number text.
    scratch: Vec<u8>,
    string_is_key: bool,
    decimal: bool,
    literal: ExpectedLiteralBuffer,
    escape: UnicodeEscapeBuffer,

    failure: Option<(SyntaxError, usize, usize)>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// Creates a tokenizer positioned before the first root value.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Vec::new(),
            cursor: 0,
            end_of_input: false,
            line: 1,
            column: 1,
            parse_state: ParseState::Root,
            lex_state: LexState::Default,
            containers: Vec::new(),
            scratch: Vec::new(),
            string_is_key: false,
            decimal: false,
            literal: ExpectedLiteralBuffer::default(),
            escape: UnicodeEscapeBuffer::default(),
            failure: None,
        }
    }

    /// Appends a chunk of input. Bytes already consumed are released first.
    pub fn feed(&mut self, chunk: &[u8]) {
        debug_assert!(!self.end_of_input, "fed input after end of input");
        if self.cursor > 0 {
            self.input.drain(..self.cursor);
            self.cursor = 0;
        }
        self.input.extend_from_slice(chunk);
    }

    /// Marks the input as closed: no further [`feed`](Self::feed) follows.
    pub fn end_of_input(&mut self) {
        self.end_of_input = true;
    }

    /// `true` if every byte fed so far has been consumed.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.cursor == self.input.len()
    }

    /// Current `(line, column)`, both 1-based; columns count bytes.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// Input text around the cursor, for diagnostics.
    #[must_use]
    pub fn near(&self) -> String {
        let start = self.cursor.saturating_sub(NEAR_CONTEXT);
        let end = (self.cursor + NEAR_CONTEXT).min(self.input.len());
        self.input[start..end].to_str_lossy().into_owned()
    }

    /// Releases buffered input and any token in flight.
    pub fn clear(&mut self) {
        self.input = Vec::new();
        self.cursor = 0;
        self.scratch = Vec::new();
    }

    /// Returns the next token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] on malformed input. The tokenizer is then
    /// unusable and every later call repeats the same error.
    pub fn next_token(&mut self) -> Result<Token, Error> {
        if let Some((source, line, column)) = &self.failure {
            return Err(Error::Syntax {
                source: source.clone(),
                line: *line,
                column: *column,
            });
        }

        loop {
            let peeked = self.peek();
            match self.step(peeked) {
                Ok(Some(token)) => return Ok(token),
                Ok(None) => {}
                Err(source) => {
                    self.failure = Some((source.clone(), self.line, self.column));
                    return Err(Error::Syntax {
                        source,
                        line: self.line,
                        column: self.column,
                    });
                }
            }
        }
    }

    #[inline]
    fn peek(&self) -> Peeked {
        match self.input.get(self.cursor) {
            Some(b) => Byte(*b),
            None if self.end_of_input => EndOfInput,
            None => Empty,
        }
    }

    #[inline]
    fn advance(&mut self) {
        if self.input.get(self.cursor) == Some(&b'\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.cursor += 1;
    }

    fn invalid(peeked: Peeked) -> SyntaxError {
        match peeked {
            Byte(b) if b.is_ascii() => SyntaxError::InvalidCharacter(char::from(b)),
            Byte(b) => SyntaxError::InvalidByte(b),
            Empty | EndOfInput => SyntaxError::UnexpectedEndOfInput,
        }
    }

    fn step(&mut self, peeked: Peeked) -> Result<Option<Token>, SyntaxError> {
        match self.lex_state {
            LexState::Default => self.step_default(peeked),
            LexState::Literal => self.step_literal(peeked),
            LexState::Number(state) => self.step_number(state, peeked),
            LexState::String => self.step_string(peeked),
            LexState::StringEscape => self.step_escape(peeked),
            LexState::StringEscapeUnicode => self.step_unicode(peeked),
        }
    }

    // ------------------------------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------------------------------

    fn step_default(&mut self, peeked: Peeked) -> Result<Option<Token>, SyntaxError> {
        use ParseState::{
            AfterArrayValue, AfterPropertyName, AfterPropertyValue, BeforeArrayValue, BeforeNextArrayValue,
            BeforeNextPropertyName, BeforePropertyName, BeforePropertyValue, Root,
        };

        let b = match peeked {
            Byte(b' ' | b'\n' | b'\r' | b'\t') => {
                self.advance();
                return Ok(None);
            }
            Byte(b) => b,
            Empty => return Ok(Some(Token::NotAvailable)),
            EndOfInput => return Ok(Some(Token::EndOfInput)),
        };

        match (self.parse_state, b) {
            (Root | BeforePropertyValue | BeforeNextArrayValue, _) => self.begin_value(b),
            (BeforeArrayValue, b']') | (AfterArrayValue, b']') => {
                self.advance();
                Ok(Some(self.close(Container::Array)))
            }
            (BeforeArrayValue, _) => self.begin_value(b),
            (BeforePropertyName, b'}') | (AfterPropertyValue, b'}') => {
                self.advance();
                Ok(Some(self.close(Container::Object)))
            }
            (BeforePropertyName | BeforeNextPropertyName, b'"') => {
                self.advance();
                self.begin_string(true);
                Ok(None)
            }
            (AfterPropertyName, b':') => {
                self.advance();
                self.parse_state = BeforePropertyValue;
                Ok(None)
            }
            (AfterPropertyValue, b',') => {
                self.advance();
                self.parse_state = BeforeNextPropertyName;
                Ok(None)
            }
            (AfterArrayValue, b',') => {
                self.advance();
                self.parse_state = BeforeNextArrayValue;
                Ok(None)
            }
            _ => Err(Self::invalid(peeked)),
        }
    }

    fn begin_value(&mut self, b: u8) -> Result<Option<Token>, SyntaxError> {
        match b {
            b'{' => {
                self.advance();
                self.containers.push(Container::Object);
                self.parse_state = ParseState::BeforePropertyName;
                Ok(Some(Token::StartObject))
            }
            b'[' => {
                self.advance();
                self.containers.push(Container::Array);
                self.parse_state = ParseState::BeforeArrayValue;
                Ok(Some(Token::StartArray))
            }
            b'"' => {
                self.advance();
                self.begin_string(false);
                Ok(None)
            }
            b'n' | b't' | b'f' => {
                self.advance();
                self.literal = ExpectedLiteralBuffer::new(b);
                self.lex_state = LexState::Literal;
                Ok(None)
            }
            b'-' | b'0'..=b'9' => {
                self.advance();
                self.scratch.clear();
                self.scratch.push(b);
                self.decimal = false;
                self.lex_state = LexState::Number(match b {
                    b'-' => NumberState::Sign,
                    b'0' => NumberState::Zero,
                    _ => NumberState::Integer,
                });
                Ok(None)
            }
            _ => Err(Self::invalid(Byte(b))),
        }
    }

    fn close(&mut self, container: Container) -> Token {
        let popped = self.containers.pop();
        debug_assert_eq!(popped, Some(container));
        self.after_value();
        match container {
            Container::Object => Token::EndObject,
            Container::Array => Token::EndArray,
        }
    }

    /// Moves the grammar past a completed value.
    fn after_value(&mut self) {
        self.lex_state = LexState::Default;
        self.parse_state = match self.containers.last() {
            None => ParseState::Root,
            Some(Container::Object) => ParseState::AfterPropertyValue,
            Some(Container::Array) => ParseState::AfterArrayValue,
        };
    }

    // ------------------------------------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------------------------------------

    fn step_literal(&mut self, peeked: Peeked) -> Result<Option<Token>, SyntaxError> {
        match peeked {
            Empty => Ok(Some(Token::NotAvailable)),
            Byte(b) => match self.literal.step(b) {
                literal::Step::NeedMore => {
                    self.advance();
                    Ok(None)
                }
                literal::Step::Done(token) => {
                    self.advance();
                    self.after_value();
                    Ok(Some(token))
                }
                literal::Step::Reject => Err(Self::invalid(peeked)),
            },
            EndOfInput => Err(SyntaxError::UnexpectedEndOfInput),
        }
    }

    // ------------------------------------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------------------------------------

    fn step_number(&mut self, state: NumberState, peeked: Peeked) -> Result<Option<Token>, SyntaxError> {
        use NumberState::{Exponent, ExponentInteger, ExponentSign, Fraction, Integer, Point, Sign, Zero};

        let next = match (state, peeked) {
            (_, Empty) => return Ok(Some(Token::NotAvailable)),
            (Sign, Byte(b'0')) => Zero,
            (Sign | Integer, Byte(b'1'..=b'9')) | (Integer, Byte(b'0')) => Integer,
            (Zero | Integer, Byte(b'.')) => Point,
            (Point | Fraction, Byte(b'0'..=b'9')) => Fraction,
            (Zero | Integer | Fraction, Byte(b'e' | b'E')) => Exponent,
            (Exponent, Byte(b'+' | b'-')) => ExponentSign,
            (Exponent | ExponentSign | ExponentInteger, Byte(b'0'..=b'9')) => ExponentInteger,
            // `01`, `1.2.3` and `1x` never split into two root values.
            (_, Byte(b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'+' | b'-')) => {
                return Err(Self::invalid(peeked));
            }
            (state, _) if state.is_terminal() => return Ok(Some(self.produce_number())),
            (_, peeked) => return Err(Self::invalid(peeked)),
        };

        if let Byte(b) = peeked {
            self.scratch.push(b);
        }
        self.decimal |= matches!(next, Point | Exponent);
        self.advance();
        self.lex_state = LexState::Number(next);

        // Fast path: copy a run of digits in one pass.
        if matches!(next, Integer | Fraction | ExponentInteger) {
            while let Some(b) = self.input.get(self.cursor).copied().filter(u8::is_ascii_digit) {
                self.scratch.push(b);
                self.cursor += 1;
                self.column += 1;
            }
        }
        Ok(None)
    }

    fn produce_number(&mut self) -> Token {
        let bytes = core::mem::take(&mut self.scratch);
        // Only ASCII digits, signs, `.` and exponents reach the scratch here.
        let text = String::from_utf8(bytes).unwrap_or_default();
        let kind = if self.decimal {
            NumberKind::BigDecimal
        } else {
            NumberKind::of_integer(&text)
        };
        self.after_value();
        Token::ValueNumber { kind, text }
    }

    // ------------------------------------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------------------------------------

    fn begin_string(&mut self, is_key: bool) {
        self.scratch.clear();
        self.string_is_key = is_key;
        self.lex_state = LexState::String;
    }

    fn step_string(&mut self, peeked: Peeked) -> Result<Option<Token>, SyntaxError> {
        if self.escape.awaiting_low_surrogate() && peeked != Byte(b'\\') && peeked != Empty {
            return Err(self.escape.unpaired().unwrap_or(SyntaxError::UnexpectedEndOfInput));
        }

        match peeked {
            Byte(b'"') => {
                self.advance();
                self.produce_string().map(Some)
            }
            Byte(b'\\') => {
                self.advance();
                self.lex_state = LexState::StringEscape;
                Ok(None)
            }
            Byte(0x00..=0x1F) => Err(Self::invalid(peeked)),
            Byte(_) => {
                // Fast path: copy a run of plain bytes in one pass.
                while let Some(b) = self
                    .input
                    .get(self.cursor)
                    .copied()
                    .filter(|b| !matches!(b, b'"' | b'\\' | 0x00..=0x1F))
                {
                    self.scratch.push(b);
                    self.cursor += 1;
                    self.column += 1;
                }
                Ok(None)
            }
            Empty => Ok(Some(Token::NotAvailable)),
            EndOfInput => Err(SyntaxError::UnexpectedEndOfInput),
        }
    }

    fn step_escape(&mut self, peeked: Peeked) -> Result<Option<Token>, SyntaxError> {
        let decoded = match peeked {
            Empty => return Ok(Some(Token::NotAvailable)),
            Byte(b'u') => {
                self.advance();
                self.escape.reset();
                self.lex_state = LexState::StringEscapeUnicode;
                return Ok(None);
            }
            _ if self.escape.awaiting_low_surrogate() => {
                return Err(self.escape.unpaired().unwrap_or(SyntaxError::UnexpectedEndOfInput));
            }
            Byte(b @ (b'"' | b'\\' | b'/')) => b,
            Byte(b'b') => 0x08,
            Byte(b'f') => 0x0C,
            Byte(b'n') => b'\n',
            Byte(b'r') => b'\r',
            Byte(b't') => b'\t',
            Byte(_) | EndOfInput => return Err(Self::invalid(peeked)),
        };
        self.advance();
        self.scratch.push(decoded);
        self.lex_state = LexState::String;
        Ok(None)
    }

    fn step_unicode(&mut self, peeked: Peeked) -> Result<Option<Token>, SyntaxError> {
        match peeked {
            Empty => Ok(Some(Token::NotAvailable)),
            Byte(b) => {
                self.advance();
                if let Some(ch) = self.escape.feed(b)? {
                    let mut buf = [0u8; 4];
                    self.scratch.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                    self.lex_state = LexState::String;
                } else if !self.escape.in_progress() {
                    // A high surrogate is in; the low half must follow as
                    // another escape.
                    self.lex_state = LexState::String;
                }
                Ok(None)
            }
            EndOfInput => Err(SyntaxError::UnexpectedEndOfInput),
        }
    }

    fn produce_string(&mut self) -> Result<Token, SyntaxError> {
        let bytes = core::mem::take(&mut self.scratch);
        let text = String::from_utf8(bytes).map_err(|_| SyntaxError::InvalidUtf8)?;
        if self.string_is_key {
            self.lex_state = LexState::Default;
            self.parse_state = ParseState::AfterPropertyName;
            Ok(Token::FieldName(text))
        } else {
            self.after_value();
            Ok(Token::ValueString(text))
        }
    }
}
