//! Tokenizer: source text to an ordered sequence of classified tokens.
//!
//! At each position the token shapes are tried in priority order and the first
//! one that matches wins:
//!
//! | Kind | Shape |
//! |---|---|
//! | `LeftParen`, `RightParen` | `(` `)` |
//! | `Boolean` | `#t` `#f` |
//! | `Number` | `[0-9]+(\.[0-9]*)?` |
//! | `Symbol` | `[a-zA-Z!+=\-.<>/*]+[a-zA-Z0-9?]*` |
//! | `String` | `"` … `"`, delimiters stripped, no escapes |
//! | `Quote` | `` ` `` or `'` |
//!
//! Whitespace is skipped. Anything else is a [`Error::LexError`].

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize},
    sequence::{delimited, pair, preceded},
};

use crate::Error;

/// Characters that may start a symbol
const SYMBOL_INITIAL_CHARS: &str = "!+=-.<>/*";

/// Parser configuration shared by the lexer, the parser and the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseConfig {
    /// Treat `;` up to end of line as whitespace. Off by default, in which
    /// case `;` is an unrecognized character.
    pub handle_comments: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Boolean,
    Number,
    Symbol,
    String,
    Quote,
}

/// A classified slice of the source. `position` is the byte offset of the
/// token's first character (the opening `"` for strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub position: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, lexeme: &'a str, position: usize) -> Self {
        Token {
            kind,
            lexeme,
            position,
        }
    }
}

fn is_symbol_initial(c: char) -> bool {
    c.is_ascii_alphabetic() || SYMBOL_INITIAL_CHARS.contains(c)
}

fn is_symbol_subsequent(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '?'
}

fn lex_paren(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        tag("(").map(|lexeme| (TokenKind::LeftParen, lexeme)),
        tag(")").map(|lexeme| (TokenKind::RightParen, lexeme)),
    ))
    .parse(input)
}

fn lex_boolean(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((tag("#t"), tag("#f")))
        .map(|lexeme| (TokenKind::Boolean, lexeme))
        .parse(input)
}

fn lex_number(input: &str) -> IResult<&str, (TokenKind, &str)> {
    recognize(pair(digit1, opt(pair(char('.'), digit0))))
        .map(|lexeme| (TokenKind::Number, lexeme))
        .parse(input)
}

fn lex_symbol(input: &str) -> IResult<&str, (TokenKind, &str)> {
    recognize(pair(
        take_while1(is_symbol_initial),
        take_while(is_symbol_subsequent),
    ))
    .map(|lexeme| (TokenKind::Symbol, lexeme))
    .parse(input)
}

/// String literal; the lexeme excludes the delimiters. An unterminated string
/// does not match, leaving the `"` to be reported as unrecognized.
fn lex_string(input: &str) -> IResult<&str, (TokenKind, &str)> {
    delimited(char('"'), take_till(|c: char| c == '"'), char('"'))
        .map(|lexeme| (TokenKind::String, lexeme))
        .parse(input)
}

fn lex_quote(input: &str) -> IResult<&str, (TokenKind, &str)> {
    recognize(one_of("`'"))
        .map(|lexeme| (TokenKind::Quote, lexeme))
        .parse(input)
}

fn lex_token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        lex_paren,
        lex_boolean,
        lex_number,
        lex_symbol,
        lex_string,
        lex_quote,
    ))
    .parse(input)
}

/// Any Unicode whitespace, including `\x0b`, `\x0c` and no-break space
fn lex_whitespace(input: &str) -> IResult<&str, &str> {
    take_while1(char::is_whitespace).parse(input)
}

fn lex_comment(input: &str) -> IResult<&str, &str> {
    preceded(char(';'), take_till(|c: char| c == '\n')).parse(input)
}

/// Whitespace and, when enabled, line comments
fn skip_atmosphere(input: &str, config: ParseConfig) -> &str {
    let mut remaining = input;
    loop {
        if let Ok((rest, _)) = lex_whitespace(remaining) {
            remaining = rest;
        } else if config.handle_comments
            && let Ok((rest, _)) = lex_comment(remaining)
        {
            remaining = rest;
        } else {
            return remaining;
        }
    }
}

/// Tokenize with the default [`ParseConfig`].
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, Error> {
    tokenize_with_config(input, ParseConfig::default())
}

pub fn tokenize_with_config(input: &str, config: ParseConfig) -> Result<Vec<Token<'_>>, Error> {
    let mut tokens = Vec::new();
    let mut remaining = skip_atmosphere(input, config);

    while !remaining.is_empty() {
        let position = input.len() - remaining.len();
        match lex_token(remaining) {
            Ok((rest, (kind, lexeme))) => {
                tokens.push(Token::new(kind, lexeme, position));
                remaining = skip_atmosphere(rest, config);
            }
            Err(_) => {
                let found = remaining.chars().next().unwrap_or_default();
                return Err(Error::LexError { found, position });
            }
        }
    }

    Ok(tokens)
}
