//! picoscheme - a small Scheme-dialect interpreter
//!
//! This crate turns source text into an expression tree and evaluates that tree
//! against a chain of lexical frames, producing a runtime [`Value`].
//!
//! ```scheme
//! (define (inc x) (+ 1 x))        ; closures bound in the root frame
//! (map inc `(1 2 3 4))            ; => (2 3 4 5)
//! (let ((a 2)) (if (> a 1) a 0))  ; lexical scope, conditionals
//! (eval `(+ 4 1))                 ; data as code => 5
//! ```
//!
//! ## Pipeline
//!
//! text → [`lexer`] → tokens → [`parser`] → [`Value`] → [`evaluator`] → [`Value`]
//!
//! The [`Context`] facade owns the root frame (pre-populated with the native
//! procedures from [`builtinops`]) and is the only entry point most callers need:
//!
//! ```
//! use picoscheme::{Context, Value};
//!
//! let ctx = Context::new();
//! ctx.evaluate("(define (square x) (* x x))").unwrap();
//! assert_eq!(ctx.evaluate("(square 7)").unwrap(), Value::Integer(49));
//! ```
//!
//! ## Truthiness
//!
//! Only `#f` and the empty list `()` are falsy. Numeric zero and the empty
//! string are truthy, and `()` is never equal to `#f`.
//!
//! ## Limitations
//!
//! Evaluation is plain recursion without tail-call elimination, so deeply
//! recursive programs can exhaust the host stack. Frames are reference
//! counted; a closure stored in the frame it captures forms a cycle that is
//! never reclaimed while the process runs.
//!
//! ## Modules
//!
//! - `lexer`: classified tokens from source text
//! - `parser`: recursive-descent parser producing [`Value`] trees
//! - `ast`: the value model shared by code and data
//! - `evaluator`: special forms, application protocol and frames
//! - `builtinops`: native procedures installed in the root frame
//! - `context`: the evaluation facade

use std::fmt;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// A token appeared where no form can start (e.g. a stray `)`)
    UnexpectedToken,
    /// Input ended before the form was complete (unclosed parens, dangling quote)
    Incomplete,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a simple ParseError with a kind and message but no context
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError with a context snippet taken from `input` around `error_offset`
    pub fn with_context_and_found(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        let context_start = input
            .get(..error_offset)
            .unwrap_or(input)
            .chars()
            .count()
            .saturating_sub(20);

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.chars().count() < input.chars().count() {
            display_context.push_str("[...]");
        }

        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(found) = &self.found {
            write!(f, "\nFound: {found}")?;
        }
        if let Some(context) = &self.context {
            write!(f, "\nContext: {context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Error types for the interpreter
///
/// Every error is fatal to the `evaluate` call that raised it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("LexError: unrecognized character '{found}' at position {position}")]
    LexError { found: char, position: usize },
    #[error("ParseError: {0}")]
    ParseError(#[from] ParseError),
    #[error("Unbound symbol: {0}")]
    UnboundSymbol(String),
    #[error("Not callable: {0}")]
    NotCallable(String),
    #[error("Malformed {form} form: {message}")]
    MalformedForm { form: &'static str, message: String },
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("ArityError: procedure expected {expected} arguments but got {got}")]
    ArityError { expected: usize, got: usize },
    #[error("IndexError: {0}")]
    IndexError(String),
    #[error("EvaluationError: {0}")]
    EvalError(String),
}

impl Error {
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError { expected, got }
    }

    pub(crate) fn malformed(form: &'static str, message: impl Into<String>) -> Self {
        Error::MalformedForm {
            form,
            message: message.into(),
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod context;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use ast::{Symbol, Value};
pub use context::Context;
pub use lexer::ParseConfig;
