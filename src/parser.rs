//! Recursive-descent parser from tokens to [`Value`] trees.
//!
//! A source text is a sequence of forms. A single form parses to itself; several
//! forms are wrapped in an implicit `(progn f1 f2 ...)` so that running a file
//! yields the value of its last form. Empty input parses to `()`.

use crate::ast::{Symbol, Value, nil, sym};
use crate::lexer::{ParseConfig, Token, TokenKind, tokenize_with_config};
use crate::{Error, ParseError, ParseErrorKind};

/// Cursor over the tokens of one source text. Parsing consumes tokens and is
/// not resumable after an error.
pub struct TokenStream<'a> {
    input: &'a str,
    tokens: &'a [Token<'a>],
    pos: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(input: &'a str, tokens: &'a [Token<'a>]) -> Self {
        TokenStream {
            input,
            tokens,
            pos: 0,
        }
    }

    pub fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(
        &self,
        kind: ParseErrorKind,
        message: impl Into<String>,
        offset: usize,
        found: Option<String>,
    ) -> Error {
        Error::ParseError(ParseError::with_context_and_found(
            kind, message, self.input, offset, found,
        ))
    }
}

/// Parse with the default [`ParseConfig`].
pub fn parse(input: &str) -> Result<Value, Error> {
    parse_with_config(input, ParseConfig::default())
}

pub fn parse_with_config(input: &str, config: ParseConfig) -> Result<Value, Error> {
    let tokens = tokenize_with_config(input, config)?;
    let mut stream = TokenStream::new(input, &tokens);

    let mut forms = Vec::new();
    while !stream.is_exhausted() {
        forms.push(parse_form(&mut stream)?);
    }

    match forms.len() {
        0 => Ok(nil()),
        1 => Ok(forms.swap_remove(0)),
        _ => {
            forms.insert(0, sym("progn"));
            Ok(Value::List(forms))
        }
    }
}

/// Consume exactly one form from the stream.
pub fn parse_form(stream: &mut TokenStream<'_>) -> Result<Value, Error> {
    let Some(token) = stream.advance() else {
        return Err(stream.error(
            ParseErrorKind::Incomplete,
            "Unexpected end of input",
            stream.input.len(),
            None,
        ));
    };

    match token.kind {
        TokenKind::Boolean => Ok(Value::Bool(token.lexeme == "#t")),
        TokenKind::Number => parse_number(stream, &token),
        TokenKind::String => Ok(Value::String(token.lexeme.to_owned())),
        TokenKind::Symbol => Ok(Value::Symbol(Symbol::new(token.lexeme))),
        TokenKind::Quote => {
            if stream.is_exhausted() {
                return Err(stream.error(
                    ParseErrorKind::Incomplete,
                    "Quote must be followed by a form",
                    token.position,
                    Some(token.lexeme.to_owned()),
                ));
            }
            let quoted = parse_form(stream)?;
            Ok(Value::List(vec![sym("quote"), quoted]))
        }
        TokenKind::LeftParen => {
            let mut elements = Vec::new();
            loop {
                match stream.peek() {
                    None => {
                        return Err(stream.error(
                            ParseErrorKind::Incomplete,
                            "Missing closing parenthesis",
                            token.position,
                            None,
                        ));
                    }
                    Some(next) if next.kind == TokenKind::RightParen => {
                        stream.advance();
                        return Ok(Value::List(elements));
                    }
                    Some(_) => elements.push(parse_form(stream)?),
                }
            }
        }
        TokenKind::RightParen => Err(stream.error(
            ParseErrorKind::UnexpectedToken,
            "Unexpected token",
            token.position,
            Some(token.lexeme.to_owned()),
        )),
    }
}

/// Whole numbers become integers; decimals, and whole numbers too large for an
/// `i64`, become floats.
fn parse_number(stream: &TokenStream<'_>, token: &Token<'_>) -> Result<Value, Error> {
    if let Ok(n) = token.lexeme.parse::<i64>() {
        return Ok(Value::Integer(n));
    }
    token.lexeme.parse::<f64>().map(Value::Float).map_err(|_| {
        stream.error(
            ParseErrorKind::UnexpectedToken,
            "Invalid number literal",
            token.position,
            Some(token.lexeme.to_owned()),
        )
    })
}
