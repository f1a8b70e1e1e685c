//! This module defines the value model of the interpreter. The main enum, [`Value`],
//! is used both for the expression tree produced by the parser and for runtime data:
//! a quoted list and a list of code are the same thing, which is what lets `quote`
//! return parsed structure and `eval` run data as code. Ergonomic helper functions
//! such as [`val`], [`sym`], and [`nil`] are provided for convenient construction
//! in both code and tests, together with conversions from common Rust types.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::evaluator::frame::Frame;
use crate::evaluator::intooperation::OperationFn;

/// An identifier, compared and hashed by name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Symbol(Rc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

/// A user-defined procedure: body forms, formal parameters and the frame it was
/// created in. Never mutated after creation.
pub struct Closure {
    forms: Vec<Value>,
    params: Vec<Symbol>,
    frame: Rc<Frame>,
}

impl Closure {
    pub fn new(forms: Vec<Value>, params: Vec<Symbol>, frame: Rc<Frame>) -> Self {
        Closure {
            forms,
            params,
            frame,
        }
    }

    pub fn forms(&self) -> &[Value] {
        &self.forms
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    /// The frame in which this closure was created
    pub fn frame(&self) -> &Rc<Frame> {
        &self.frame
    }

    /// Apply this closure to already-evaluated arguments.
    ///
    /// Parameters are bound pairwise: surplus arguments are ignored, and
    /// parameters without an argument stay unbound until first use.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, Error> {
        let bindings = self.params.iter().cloned().zip(args).collect();
        let frame = Rc::new(Frame::with_bindings(bindings, Some(Rc::clone(&self.frame))));
        crate::evaluator::eval_body(&self.forms, &frame)
    }
}

impl fmt::Debug for Closure {
    // The captured frame is left out: it usually contains this closure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("forms", &self.forms)
            .finish_non_exhaustive()
    }
}

/// Core value type of the interpreter
///
/// To build a value, use the ergonomic helper functions:
/// - `val(42)` for values, `sym("name")` for symbols, `nil()` for empty lists
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// String literals (no escape processing)
    String(String),
    Symbol(Symbol),
    /// Ordered sequences; the empty list is nil
    List(Vec<Value>),
    Closure(Rc<Closure>),
    /// Host-provided procedures. Compared by id, not by function pointer.
    NativeProcedure { id: String, func: Rc<OperationFn> },
}

impl Value {
    /// Check if a value represents nil (empty list)
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// `#f` and `()` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false)) && !self.is_nil()
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::NativeProcedure { .. })
    }

    /// Name of the variant, used in type errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Closure(_) => "closure",
            Value::NativeProcedure { .. } => "native procedure",
        }
    }
}

/// Numeric view of a [`Value`], used by the arithmetic natives
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Integer(n) => n == 0,
            Number::Float(x) => x == 0.0,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(n) => Value::Integer(n),
            Number::Float(x) => Value::Float(x),
        }
    }
}

impl TryFrom<Value> for Number {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::Integer(n) => Ok(Number::Integer(n)),
            Value::Float(x) => Ok(Number::Float(x)),
            other => Err(Error::TypeError(format!(
                "expected number, got {}: {other}",
                other.type_name()
            ))),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<Closure> for Value {
    fn from(c: Closure) -> Self {
        Value::Closure(Rc::new(c))
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(n as i64)
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(Symbol::new(name))
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating empty lists (nil)
pub fn nil() -> Value {
    Value::List(vec![])
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Symbol(s) => write!(f, "{s:?}"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::Closure(closure) => write!(f, "{closure:?}"),
            Value::NativeProcedure { id, .. } => write!(f, "NativeProcedure({id})"),
        }
    }
}

/// Scheme-style printing. The output is meant for people and does not always
/// re-parse: `-5` lexes as a symbol and a float such as `1e20` as `1` followed
/// by `e20`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            // `{:?}` keeps the fractional part, so 2.0 does not print as an integer
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::Closure(_) => write!(f, "#<closure>"),
            Value::NativeProcedure { id, .. } => write!(f, "#<native-procedure:{id}>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::NativeProcedure { id: id1, .. }, Value::NativeProcedure { id: id2, .. }) => {
                id1 == id2
            }
            _ => false, // Different variants are never equal
        }
    }
}
