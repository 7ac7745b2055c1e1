//! Assembles tokens into [`Value`] trees without recursion.
//!
//! The builder keeps one heap-resident frame per open container or pending
//! field, so it can stop after any token and resume when the next one
//! arrives. A root value is returned from [`TreeBuilder::parse_token`] only
//! once it is complete.
//!
//! `ignore_level` unwraps outer containers: with `ignore_level = 1` the
//! elements of a top-level array are returned one by one instead of the
//! array itself.

use core::fmt;

use crate::{
    error::ParseStateError,
    tokenizer::Token,
    value::{Array, Map, Number, Value},
};

/// The kind of frame on top of the builder's context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Between root values, or inside an ignored outer container.
    Root,
    /// An object returned to the caller when it closes.
    RootObject,
    /// An array returned to the caller when it closes.
    RootArray,
    /// An object grafted onto its parent when it closes.
    ChildObject,
    /// An array grafted onto its parent when it closes.
    ChildArray,
    /// A field name waiting for its value.
    Field,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContextKind::Root => "root",
            ContextKind::RootObject => "root object",
            ContextKind::RootArray => "root array",
            ContextKind::ChildObject => "child object",
            ContextKind::ChildArray => "child array",
            ContextKind::Field => "field",
        })
    }
}

/// One frame of the context stack.
///
/// A `Field` frame always sits directly above the object it belongs to, so
/// its value is inserted into the frame beneath it.
#[derive(Debug)]
enum ParserContext {
    Root { levels_ignored: usize },
    RootObject(Map),
    RootArray(Array),
    ChildObject(Map),
    ChildArray(Array),
    Field { name: String },
}

impl ParserContext {
    fn kind(&self) -> ContextKind {
        match self {
            ParserContext::Root { .. } => ContextKind::Root,
            ParserContext::RootObject(_) => ContextKind::RootObject,
            ParserContext::RootArray(_) => ContextKind::RootArray,
            ParserContext::ChildObject(_) => ContextKind::ChildObject,
            ParserContext::ChildArray(_) => ContextKind::ChildArray,
            ParserContext::Field { .. } => ContextKind::Field,
        }
    }
}

/// Turns a token sequence into completed root values.
#[derive(Debug)]
pub struct TreeBuilder {
    ignore_level: usize,
    /// The frame that handles the next token.
    current: ParserContext,
    /// Frames beneath `current`; `Root` is always at the bottom.
    parents: Vec<ParserContext>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TreeBuilder {
    /// Creates a builder that unwraps `ignore_level` outer containers.
    #[must_use]
    pub fn new(ignore_level: usize) -> Self {
        Self {
            ignore_level,
            current: ParserContext::Root { levels_ignored: 0 },
            parents: Vec::new(),
        }
    }

    /// The kind of the frame that will handle the next token.
    #[must_use]
    pub fn context(&self) -> ContextKind {
        self.current.kind()
    }

    /// Number of frames above the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parents.len()
    }

    /// Feeds one token, returning a root value if it completed one.
    ///
    /// [`Token::NotAvailable`] is a no-op and [`Token::EndOfInput`] performs
    /// the [`complete`](Self::complete) check.
    ///
    /// # Errors
    ///
    /// Returns [`ParseStateError::UnexpectedToken`] for a token the current
    /// context cannot accept, or [`ParseStateError::PrematureEnd`] if the
    /// input ends inside a container.
    pub fn parse_token(&mut self, token: Token) -> Result<Option<Value>, ParseStateError> {
        match token {
            Token::NotAvailable => return Ok(None),
            Token::EndOfInput => return self.complete().map(|()| None),
            _ => {}
        }

        match &mut self.current {
            ParserContext::Root { levels_ignored } => match token {
                Token::StartObject | Token::StartArray if *levels_ignored < self.ignore_level => {
                    *levels_ignored += 1;
                    Ok(None)
                }
                Token::StartObject => {
                    self.push(ParserContext::RootObject(Map::new()));
                    Ok(None)
                }
                Token::StartArray => {
                    self.push(ParserContext::RootArray(Array::new()));
                    Ok(None)
                }
                Token::EndObject | Token::EndArray if *levels_ignored > 0 => {
                    *levels_ignored -= 1;
                    Ok(None)
                }
                token => Err(self.unexpected(&token)),
            },

            ParserContext::RootObject(_) | ParserContext::ChildObject(_) => match token {
                Token::FieldName(name) => {
                    self.push(ParserContext::Field { name });
                    Ok(None)
                }
                Token::EndObject => self.close(),
                token => Err(self.unexpected(&token)),
            },

            ParserContext::RootArray(array) | ParserContext::ChildArray(array) => match token {
                Token::StartObject => {
                    self.push(ParserContext::ChildObject(Map::new()));
                    Ok(None)
                }
                Token::StartArray => {
                    self.push(ParserContext::ChildArray(Array::new()));
                    Ok(None)
                }
                Token::EndArray => self.close(),
                token => match scalar(token) {
                    Ok(value) => {
                        array.push(value);
                        Ok(None)
                    }
                    Err(token) => Err(self.unexpected(&token)),
                },
            },

            ParserContext::Field { .. } => match token {
                Token::StartObject => {
                    self.push(ParserContext::ChildObject(Map::new()));
                    Ok(None)
                }
                Token::StartArray => {
                    self.push(ParserContext::ChildArray(Array::new()));
                    Ok(None)
                }
                token => match scalar(token) {
                    Ok(value) => {
                        self.fill_field(value)?;
                        Ok(None)
                    }
                    Err(token) => Err(self.unexpected(&token)),
                },
            },
        }
    }

    /// Checks that the input ended between root values.
    ///
    /// # Errors
    ///
    /// Returns [`ParseStateError::PrematureEnd`] if a container (including an
    /// ignored outer one) is still open.
    pub fn complete(&self) -> Result<(), ParseStateError> {
        match self.current {
            ParserContext::Root { levels_ignored: 0 } => Ok(()),
            _ => Err(ParseStateError::PrematureEnd {
                context: self.current.kind(),
            }),
        }
    }

    fn push(&mut self, context: ParserContext) {
        let parent = core::mem::replace(&mut self.current, context);
        self.parents.push(parent);
    }

    fn pop(&mut self) -> Result<ParserContext, ParseStateError> {
        let parent = self.parents.pop().ok_or(ParseStateError::UnexpectedToken {
            token: Token::EndOfInput.to_string(),
            context: ContextKind::Root,
        })?;
        Ok(core::mem::replace(&mut self.current, parent))
    }

    /// Closes the current container, returning it if it was a root value.
    fn close(&mut self) -> Result<Option<Value>, ParseStateError> {
        match self.pop()? {
            ParserContext::RootObject(map) => Ok(Some(Value::Object(map))),
            ParserContext::RootArray(array) => Ok(Some(Value::Array(array))),
            ParserContext::ChildObject(map) => self.graft(Value::Object(map)).map(|()| None),
            ParserContext::ChildArray(array) => self.graft(Value::Array(array)).map(|()| None),
            other => Err(ParseStateError::UnexpectedToken {
                token: "container end".into(),
                context: other.kind(),
            }),
        }
    }

    /// Attaches a completed child container to the frame now on top.
    fn graft(&mut self, value: Value) -> Result<(), ParseStateError> {
        match &mut self.current {
            ParserContext::RootArray(array) | ParserContext::ChildArray(array) => {
                array.push(value);
                Ok(())
            }
            ParserContext::Field { .. } => self.fill_field(value),
            other => Err(ParseStateError::UnexpectedToken {
                token: "container end".into(),
                context: other.kind(),
            }),
        }
    }

    /// Inserts `value` under the current field name and retires the field.
    fn fill_field(&mut self, value: Value) -> Result<(), ParseStateError> {
        let ParserContext::Field { name } = self.pop()? else {
            return Err(ParseStateError::UnexpectedToken {
                token: value.to_string(),
                context: self.current.kind(),
            });
        };
        match &mut self.current {
            ParserContext::RootObject(map) | ParserContext::ChildObject(map) => {
                map.insert(name, value);
                Ok(())
            }
            other => Err(ParseStateError::UnexpectedToken {
                token: Token::FieldName(name).to_string(),
                context: other.kind(),
            }),
        }
    }

    fn unexpected(&self, token: &Token) -> ParseStateError {
        ParseStateError::UnexpectedToken {
            token: token.to_string(),
            context: self.current.kind(),
        }
    }
}

/// Converts a scalar token into its value, handing anything else back.
fn scalar(token: Token) -> Result<Value, Token> {
    match token {
        Token::ValueString(s) => Ok(Value::String(s)),
        Token::ValueNumber { kind, text } => Ok(Value::Number(Number::from_kind(kind, text))),
        Token::ValueBool(b) => Ok(Value::Boolean(b)),
        Token::ValueNull => Ok(Value::Null),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::Tokenizer;

    const NESTED: &str = r#"{"string":["test"],"array":[1,2,3],"object":{"number":100}}"#;

    fn tokens(src: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new();
        tokenizer.feed(src.as_bytes());
        tokenizer.end_of_input();
        let mut out = Vec::new();
        loop {
            let token = tokenizer.next_token().unwrap();
            let end = token == Token::EndOfInput;
            out.push(token);
            if end {
                return out;
            }
        }
    }

    fn build(src: &str, ignore_level: usize) -> Result<Vec<Value>, ParseStateError> {
        let mut builder = TreeBuilder::new(ignore_level);
        let mut out = Vec::new();
        for token in tokens(src) {
            out.extend(builder.parse_token(token)?);
        }
        Ok(out)
    }

    #[test]
    fn returns_root_object_on_last_token() {
        let mut builder = TreeBuilder::default();
        let tokens = tokens(NESTED);
        // 17 tokens plus end of input.
        assert_eq!(tokens.len(), 18);
        for (i, token) in tokens.into_iter().enumerate() {
            let value = builder.parse_token(token).unwrap();
            assert_eq!(value.is_some(), i == 16, "token {i}");
            if let Some(value) = value {
                assert_eq!(value.to_string(), NESTED);
            }
        }
        assert_eq!(builder.context(), ContextKind::Root);
    }

    #[test]
    fn ignore_level_one_unwraps_outer_array() {
        let src = format!("[{NESTED}]");
        let mut builder = TreeBuilder::new(1);
        let tokens = tokens(&src);
        assert_eq!(tokens.len(), 20);
        let hits: Vec<usize> = tokens
            .into_iter()
            .enumerate()
            .filter_map(|(i, token)| builder.parse_token(token).unwrap().map(|_| i + 1))
            .collect();
        assert_eq!(hits, vec![18]);
    }

    #[test]
    fn ignore_level_two_rejects_field_names_at_root() {
        let src = format!("[{NESTED}]");
        let err = build(&src, 2).unwrap_err();
        assert_eq!(
            err,
            ParseStateError::UnexpectedToken {
                token: r#"FIELD_NAME "string""#.into(),
                context: ContextKind::Root,
            }
        );
    }

    #[rstest]
    #[case(r#"[{"x":1},{"x":2}]"#, 0, &[r#"[{"x":1},{"x":2}]"#])]
    #[case(r#"[{"x":1},{"x":2}]"#, 1, &[r#"{"x":1}"#, r#"{"x":2}"#])]
    #[case(r#"[[[1],[2]],[[3]]]"#, 2, &["[1]", "[2]", "[3]"])]
    #[case(r#"{"a":1}{"b":[true,null]}"#, 0, &[r#"{"a":1}"#, r#"{"b":[true,null]}"#])]
    #[case(r#"[[],{}]"#, 1, &["[]", "{}"])]
    #[case(r#"[]"#, 1, &[])]
    fn builds_values(#[case] src: &str, #[case] ignore_level: usize, #[case] expected: &[&str]) {
        let values: Vec<String> = build(src, ignore_level).unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn deep_nesting_grafts_into_fields_and_arrays() {
        let src = r#"{"a":{"b":[{"c":[[]]},{"d":{}}]},"e":"f"}"#;
        let values = build(src, 0).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].to_string(), src);
        assert_eq!(values[0].get("e").and_then(Value::as_str), Some("f"));
    }

    #[test]
    fn duplicate_field_last_write_wins() {
        let values = build(r#"{"a":1,"b":2,"a":3}"#, 0).unwrap();
        assert_eq!(values[0].to_string(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn numbers_keep_their_kind() {
        let values = build(r#"[1,3000000000,1234567890123456789012345678901234567890,1.50]"#, 0).unwrap();
        let array = values[0].as_array().unwrap();
        assert_eq!(array[0], Value::Number(Number::Int(1)));
        assert_eq!(array[1], Value::Number(Number::Long(3_000_000_000)));
        assert_eq!(
            array[2],
            Value::Number(Number::BigInteger("1234567890123456789012345678901234567890".into()))
        );
        assert_eq!(array[3], Value::Number(Number::BigDecimal("1.50".into())));
    }

    #[rstest]
    #[case("1", ContextKind::Root)]
    #[case(r#""s""#, ContextKind::Root)]
    #[case("null", ContextKind::Root)]
    fn scalar_at_root_is_rejected(#[case] src: &str, #[case] context: ContextKind) {
        let err = build(src, 0).unwrap_err();
        assert!(matches!(err, ParseStateError::UnexpectedToken { context: c, .. } if c == context));
    }

    #[rstest]
    #[case(r#"{"a":1,"#, ContextKind::RootObject)]
    #[case(r#"{"a":"#, ContextKind::Field)]
    #[case(r#"[[1]"#, ContextKind::RootArray)]
    #[case(r#"[{"a":[1,"#, ContextKind::ChildArray)]
    fn premature_end(#[case] src: &str, #[case] context: ContextKind) {
        let mut builder = TreeBuilder::default();
        let mut tokenizer = Tokenizer::new();
        tokenizer.feed(src.as_bytes());
        loop {
            match tokenizer.next_token().unwrap() {
                Token::NotAvailable => break,
                token => assert_eq!(builder.parse_token(token).unwrap(), None),
            }
        }
        assert_eq!(builder.complete(), Err(ParseStateError::PrematureEnd { context }));
    }

    #[test]
    fn premature_end_inside_ignored_level() {
        let mut builder = TreeBuilder::new(1);
        builder.parse_token(Token::StartArray).unwrap();
        assert_eq!(builder.context(), ContextKind::Root);
        assert!(builder.parse_token(Token::EndOfInput).is_err());
    }

    #[test]
    fn depth_tracks_open_frames() {
        let mut builder = TreeBuilder::default();
        builder.parse_token(Token::StartObject).unwrap();
        builder.parse_token(Token::FieldName("a".into())).unwrap();
        builder.parse_token(Token::StartArray).unwrap();
        assert_eq!(builder.depth(), 3);
        assert_eq!(builder.context(), ContextKind::ChildArray);
        builder.parse_token(Token::EndArray).unwrap();
        assert_eq!(builder.depth(), 1);
        assert_eq!(builder.context(), ContextKind::RootObject);
    }
}
