//! Evaluation of expression trees against a chain of [`Frame`]s.
//!
//! A list whose head is one of the special-form keywords is dispatched to the
//! matching handler with its operands unevaluated. Any other non-empty list is
//! a procedure application: the head and then each argument are evaluated left
//! to right and the result is handed to [`apply`]. Symbols are looked up;
//! every other value, including `()`, evaluates to itself.
//!
//! Keywords are recognised by name before any lookup, so binding a symbol
//! such as `if` does not change how `(if ...)` evaluates.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::Error;
use crate::ast::{Closure, Symbol, Value, nil};
use crate::builtinops::get_builtin_ops;

pub mod frame;
pub mod intooperation;

use frame::Frame;

/// Number of arguments a native procedure accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn validate(&self, got: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(expected) if got != expected => Err(Error::arity_error(expected, got)),
            Arity::AtLeast(min) if got < min => Err(Error::arity_error(min, got)),
            _ => Ok(()),
        }
    }
}

/// Signature shared by all special-form handlers: unevaluated operands plus
/// the frame the form appears in.
type SpecialFormFn = fn(&[Value], &Rc<Frame>) -> Result<Value, Error>;

/// The syntactic keywords of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Quote,
    Progn,
    If,
    Cond,
    Set,
    Define,
    Lambda,
    Let,
    And,
    Or,
}

impl SpecialForm {
    pub const ALL: [SpecialForm; 10] = [
        SpecialForm::Quote,
        SpecialForm::Progn,
        SpecialForm::If,
        SpecialForm::Cond,
        SpecialForm::Set,
        SpecialForm::Define,
        SpecialForm::Lambda,
        SpecialForm::Let,
        SpecialForm::And,
        SpecialForm::Or,
    ];

    pub fn from_symbol(symbol: &Symbol) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|form| form.name() == symbol.name())
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Quote => "quote",
            SpecialForm::Progn => "progn",
            SpecialForm::If => "if",
            SpecialForm::Cond => "cond",
            SpecialForm::Set => "set",
            SpecialForm::Define => "define",
            SpecialForm::Lambda => "lambda",
            SpecialForm::Let => "let",
            SpecialForm::And => "and",
            SpecialForm::Or => "or",
        }
    }

    fn handler(self) -> SpecialFormFn {
        match self {
            SpecialForm::Quote => eval_quote,
            SpecialForm::Progn => eval_progn,
            SpecialForm::If => eval_if,
            SpecialForm::Cond => eval_cond,
            SpecialForm::Set => eval_set,
            SpecialForm::Define => eval_define,
            SpecialForm::Lambda => eval_lambda,
            SpecialForm::Let => eval_let,
            SpecialForm::And => eval_and,
            SpecialForm::Or => eval_or,
        }
    }
}

/// Evaluate an expression in the given frame
pub fn eval(expr: &Value, frame: &Rc<Frame>) -> Result<Value, Error> {
    match expr {
        Value::Symbol(symbol) => frame
            .lookup(symbol)
            .ok_or_else(|| Error::UnboundSymbol(symbol.name().to_owned())),

        Value::List(elements) => match elements.as_slice() {
            [] => Ok(nil()),
            [head, operands @ ..] => {
                if let Value::Symbol(keyword) = head
                    && let Some(form) = SpecialForm::from_symbol(keyword)
                {
                    trace!(form = form.name(), "special form");
                    return form.handler()(operands, frame);
                }

                let procedure = eval(head, frame)?;
                let args = eval_args(operands, frame)?;
                apply(&procedure, args)
            }
        },

        Value::Integer(_)
        | Value::Float(_)
        | Value::Bool(_)
        | Value::String(_)
        | Value::Closure(_)
        | Value::NativeProcedure { .. } => Ok(expr.clone()),
    }
}

fn eval_args(args: &[Value], frame: &Rc<Frame>) -> Result<Vec<Value>, Error> {
    args.iter().map(|arg| eval(arg, frame)).collect()
}

/// Apply a procedure to already-evaluated arguments.
///
/// Closures bind their parameters pairwise in a child of the frame they were
/// created in and evaluate their body there; native procedures receive the
/// arguments as given. Any other value is an [`Error::NotCallable`].
pub fn apply(procedure: &Value, args: Vec<Value>) -> Result<Value, Error> {
    match procedure {
        Value::Closure(closure) => {
            trace!(params = closure.params().len(), args = args.len(), "apply closure");
            closure.call(args)
        }
        Value::NativeProcedure { id, func } => {
            trace!(%id, args = args.len(), "apply native procedure");
            func(args)
        }
        other => Err(Error::NotCallable(format!("{other}"))),
    }
}

/// Evaluate forms in order and return the value of the last one, or `()` when
/// there are none.
pub(crate) fn eval_body(forms: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    let mut result = nil();
    for form in forms {
        result = eval(form, frame)?;
    }
    Ok(result)
}

/// Collect a parameter list. Every element must be a symbol.
fn symbol_list(form: &'static str, elements: &[Value]) -> Result<Vec<Symbol>, Error> {
    elements
        .iter()
        .map(|element| match element {
            Value::Symbol(symbol) => Ok(symbol.clone()),
            other => Err(Error::malformed(
                form,
                format!("expected a symbol, got {other}"),
            )),
        })
        .collect()
}

pub(crate) fn eval_quote(args: &[Value], _frame: &Rc<Frame>) -> Result<Value, Error> {
    match args {
        [expr] => Ok(expr.clone()),
        _ => Err(Error::malformed(
            "quote",
            format!("expected 1 operand, got {}", args.len()),
        )),
    }
}

pub(crate) fn eval_progn(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    eval_body(args, frame)
}

pub(crate) fn eval_if(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    match args {
        [condition, consequent, alternative] => {
            if eval(condition, frame)?.is_truthy() {
                eval(consequent, frame)
            } else {
                eval(alternative, frame)
            }
        }
        _ => Err(Error::malformed(
            "if",
            format!("expected 3 operands, got {}", args.len()),
        )),
    }
}

/// Clauses are checked as they are reached; the first truthy test selects
/// its expression. No match yields `()`.
pub(crate) fn eval_cond(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    for clause in args {
        match clause {
            Value::List(parts) => match parts.as_slice() {
                [test, expr] => {
                    if eval(test, frame)?.is_truthy() {
                        return eval(expr, frame);
                    }
                }
                _ => {
                    return Err(Error::malformed(
                        "cond",
                        format!("clause must have 2 elements, got {clause}"),
                    ));
                }
            },
            other => {
                return Err(Error::malformed(
                    "cond",
                    format!("clause must be a list, got {other}"),
                ));
            }
        }
    }
    Ok(nil())
}

/// `(set NAME EXPR)` binds in the current frame only, even when an enclosing
/// frame already binds NAME.
pub(crate) fn eval_set(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval(expr, frame)?;
            frame.bind(name.clone(), value);
            Ok(nil())
        }
        [other, _] => Err(Error::malformed(
            "set",
            format!("expected a symbol, got {other}"),
        )),
        _ => Err(Error::malformed(
            "set",
            format!("expected 2 operands, got {}", args.len()),
        )),
    }
}

/// `(define (NAME PARAM...) BODY...)`
pub(crate) fn eval_define(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    let [Value::List(signature), body @ ..] = args else {
        return Err(Error::malformed(
            "define",
            "expected a signature list (name params...)",
        ));
    };
    let signature = symbol_list("define", signature)?;
    let Some((name, params)) = signature.split_first() else {
        return Err(Error::malformed("define", "signature must name the procedure"));
    };

    let closure = Closure::new(body.to_vec(), params.to_vec(), Rc::clone(frame));
    frame.bind(name.clone(), Value::Closure(Rc::new(closure)));
    Ok(nil())
}

/// `(lambda (PARAM...) BODY...)`
pub(crate) fn eval_lambda(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    match args {
        [Value::List(params), body @ ..] => {
            let params = symbol_list("lambda", params)?;
            let closure = Closure::new(body.to_vec(), params, Rc::clone(frame));
            Ok(Value::Closure(Rc::new(closure)))
        }
        [other, ..] => Err(Error::malformed(
            "lambda",
            format!("parameters must be a list, got {other}"),
        )),
        [] => Err(Error::malformed("lambda", "missing parameter list")),
    }
}

/// `(let ((NAME EXPR)...) BODY)`: every EXPR is evaluated in the outer frame,
/// then BODY in one new child frame holding all the bindings.
pub(crate) fn eval_let(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
    let [Value::List(bindings), body] = args else {
        return Err(Error::malformed(
            "let",
            "expected a binding list and a single body form",
        ));
    };

    let mut values = HashMap::with_capacity(bindings.len());
    for binding in bindings {
        match binding {
            Value::List(pair) => match pair.as_slice() {
                [Value::Symbol(name), expr] => {
                    values.insert(name.clone(), eval(expr, frame)?);
                }
                _ => {
                    return Err(Error::malformed(
                        "let",
                        format!("binding must be (name expr), got {binding}"),
                    ));
                }
            },
            other => {
                return Err(Error::malformed(
                    "let",
                    format!("binding must be a list, got {other}"),
                ));
            }
        }
    }

    let child = Rc::new(Frame::with_bindings(values, Some(Rc::clone(frame))));
    eval(body, &child)
}

// `and` stops at the first falsy operand, `or` at the first truthy one. The
// result is always a boolean, never the operand itself.
macro_rules! truthiness_logic_op {
    ($name:ident, $short_circuit_on:literal) => {
        pub(crate) fn $name(args: &[Value], frame: &Rc<Frame>) -> Result<Value, Error> {
            for arg in args {
                if eval(arg, frame)?.is_truthy() == $short_circuit_on {
                    return Ok(Value::Bool($short_circuit_on));
                }
            }
            Ok(Value::Bool(!$short_circuit_on))
        }
    };
}

truthiness_logic_op!(eval_and, false);
truthiness_logic_op!(eval_or, true);

/// Create a root frame holding every built-in native procedure
pub fn create_global_env() -> Frame {
    let frame = Frame::new();
    for op in get_builtin_ops() {
        frame.bind(
            Symbol::new(op.scheme_id),
            Value::NativeProcedure {
                id: op.scheme_id.to_owned(),
                func: op.func,
            },
        );
    }
    frame
}
