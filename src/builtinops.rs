//! Registry of the native procedures installed in every root frame.
//!
//! ```scheme
//! (+ 1 2.5)              ; => 3.5
//! (/ 7 2)                ; => 3.5, and (/ 8 2) => 4
//! (< 1 2 3)              ; chained pairwise
//! (map car `((1) (2)))   ; => (1 2)
//! ```
//!
//! ## Numbers
//!
//! Integer arithmetic is checked and reports overflow as an error. As soon as
//! one operand is a float the result is a float. `/` on two integers stays an
//! integer when the division is exact, so `(eq? (/ 8 2) 4.0)` is `#f` while
//! `(= (/ 8 2) 4.0)` is `#t`.
//!
//! ## Truthiness
//!
//! `not` and `filter` follow the evaluator's rule: only `#f` and `()` are
//! falsy.
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** with typed parameters (see
//!    [`crate::evaluator::intooperation`] for the supported types)
//! 2. **Add a [`BuiltinOp`]** to [`get_builtin_ops`] with its identifier and arity
//! 3. **Add tests** to the table below

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::ast::{Number, Value};
use crate::evaluator::intooperation::{IntoOperation, IntoVariadicOperation, OperationFn, Rest};
use crate::evaluator::{Arity, apply};

/// Definition of a built-in native procedure
#[derive(Clone)]
pub struct BuiltinOp {
    /// The identifier this procedure is bound to
    pub scheme_id: &'static str,
    pub func: Rc<OperationFn>,
    /// Expected number of arguments
    pub arity: Arity,
}

impl fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinOp")
            .field("scheme_id", &self.scheme_id)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.scheme_id == other.scheme_id
    }
}

//
// Arithmetic
//

fn combine(
    a: Number,
    b: Number,
    op_name: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Number, Error> {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => int_op(x, y)
            .map(Number::Integer)
            .ok_or_else(|| Error::EvalError(format!("Integer overflow in {op_name}"))),
        _ => Ok(Number::Float(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn builtin_add(nums: Vec<Number>) -> Result<Number, Error> {
    nums.into_iter().try_fold(Number::Integer(0), |sum, n| {
        combine(sum, n, "addition", i64::checked_add, |x, y| x + y)
    })
}

fn builtin_sub(first: Number, rest: Vec<Number>) -> Result<Number, Error> {
    if rest.is_empty() {
        return match first {
            Number::Integer(n) => n
                .checked_neg()
                .map(Number::Integer)
                .ok_or_else(|| Error::EvalError("Integer overflow in negation".into())),
            Number::Float(x) => Ok(Number::Float(-x)),
        };
    }

    rest.into_iter().try_fold(first, |result, n| {
        combine(result, n, "subtraction", i64::checked_sub, |x, y| x - y)
    })
}

fn builtin_mul(nums: Vec<Number>) -> Result<Number, Error> {
    nums.into_iter().try_fold(Number::Integer(1), |product, n| {
        combine(product, n, "multiplication", i64::checked_mul, |x, y| x * y)
    })
}

/// Exact integer quotients stay integers; anything else is a float.
fn builtin_div(a: Number, b: Number) -> Result<Number, Error> {
    if b.is_zero() {
        return Err(Error::EvalError("Division by zero".into()));
    }
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => match x.checked_rem(y) {
            Some(0) => Ok(Number::Integer(x / y)),
            Some(_) => Ok(Number::Float(x as f64 / y as f64)),
            None => Err(Error::EvalError("Integer overflow in division".into())),
        },
        _ => Ok(Number::Float(a.as_f64() / b.as_f64())),
    }
}

/// Floored modulo: a non-zero result has the sign of the divisor.
fn builtin_mod(a: Number, b: Number) -> Result<Number, Error> {
    if b.is_zero() {
        return Err(Error::EvalError("Modulo by zero".into()));
    }
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => {
            // i64::MIN % -1 overflows, but the floored result is 0
            let r = x.checked_rem(y).unwrap_or(0);
            Ok(Number::Integer(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let r = x % y;
            Ok(Number::Float(if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r }))
        }
    }
}

//
// Comparison
//

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Integer(n) => Some(Number::Integer(*n)),
        Value::Float(x) => Some(Number::Float(*x)),
        _ => None,
    }
}

/// Order two numbers (mixed integer/float compare numerically) or two strings.
fn compare_values(a: &Value, b: &Value) -> Result<Ordering, Error> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.as_f64().partial_cmp(&y.as_f64()).ok_or_else(|| {
                Error::EvalError(format!("Cannot order {a} and {b}"))
            }),
            _ => Err(Error::TypeError(format!(
                "Cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

// Macro to generate chained ordering comparisons
macro_rules! ordering_comparison {
    ($name:ident, $holds:ident) => {
        fn $name(first: Value, rest: Vec<Value>) -> Result<bool, Error> {
            // All adjacent pairs must satisfy the comparison
            let mut prev = first;
            for current in rest {
                if !compare_values(&prev, &current)?.$holds() {
                    return Ok(false);
                }
                prev = current;
            }
            Ok(true)
        }
    };
}

ordering_comparison!(builtin_lt, is_lt);
ordering_comparison!(builtin_gt, is_gt);
ordering_comparison!(builtin_le, is_le);
ordering_comparison!(builtin_ge, is_ge);

/// Numbers compare numerically, everything else structurally.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x == y,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.as_f64() == y.as_f64(),
            _ => a == b,
        },
    }
}

fn builtin_numeric_eq(first: Value, rest: Vec<Value>) -> bool {
    let mut prev = first;
    for current in rest {
        if !loosely_equal(&prev, &current) {
            return false;
        }
        prev = current;
    }
    true
}

/// Same variant and equal value: `(eq? 2 2.0)` is false.
fn builtin_eq(a: Value, b: Value) -> bool {
    a == b
}

//
// Lists
//

fn builtin_null(value: Value) -> bool {
    value.is_nil()
}

fn builtin_car(list: Vec<Value>) -> Result<Value, Error> {
    list.into_iter()
        .next()
        .ok_or_else(|| Error::IndexError("car of empty list".into()))
}

fn builtin_cdr(list: Vec<Value>) -> Result<Vec<Value>, Error> {
    let mut iter = list.into_iter();
    if iter.next().is_none() {
        return Err(Error::IndexError("cdr of empty list".into()));
    }
    Ok(iter.collect())
}

fn builtin_cons(first: Value, rest: Vec<Value>) -> Vec<Value> {
    let mut new_list = Vec::with_capacity(rest.len() + 1);
    new_list.push(first);
    new_list.extend(rest);
    new_list
}

fn builtin_length(value: Value) -> Result<i64, Error> {
    let len = match &value {
        Value::List(elements) => elements.len(),
        Value::String(s) => s.chars().count(),
        other => {
            return Err(Error::TypeError(format!(
                "length expects a list or string, got {}: {other}",
                other.type_name()
            )));
        }
    };
    i64::try_from(len).map_err(|_| Error::EvalError("length out of range".into()))
}

fn builtin_not(value: Value) -> bool {
    !value.is_truthy()
}

//
// Higher-order
//

fn builtin_map(procedure: Value, list: Vec<Value>) -> Result<Vec<Value>, Error> {
    list.into_iter()
        .map(|element| apply(&procedure, vec![element]))
        .collect()
}

fn builtin_filter(procedure: Value, list: Vec<Value>) -> Result<Vec<Value>, Error> {
    let mut kept = Vec::new();
    for element in list {
        if apply(&procedure, vec![element.clone()])?.is_truthy() {
            kept.push(element);
        }
    }
    Ok(kept)
}

fn builtin_apply(procedure: Value, args: Vec<Value>) -> Result<Value, Error> {
    apply(&procedure, args)
}

/// All built-in native procedures.
///
/// Built fresh for each root frame: the erased functions are `Rc`s and cannot
/// live in a shared static.
pub(crate) fn get_builtin_ops() -> Vec<BuiltinOp> {
    fn builtin_fixed<Args, F>(f: F) -> Rc<OperationFn>
    where
        F: IntoOperation<Args>,
    {
        <F as IntoOperation<Args>>::into_operation(f)
    }

    fn builtin_variadic<Args, F>(f: F, arity: Arity) -> Rc<OperationFn>
    where
        F: IntoVariadicOperation<Args>,
    {
        <F as IntoVariadicOperation<Args>>::into_variadic_operation(f, arity)
    }

    fn fixed<Args, F>(scheme_id: &'static str, arity: usize, f: F) -> BuiltinOp
    where
        F: IntoOperation<Args>,
    {
        BuiltinOp {
            scheme_id,
            func: builtin_fixed::<Args, F>(f),
            arity: Arity::Exact(arity),
        }
    }

    fn variadic<Args, F>(scheme_id: &'static str, arity: Arity, f: F) -> BuiltinOp
    where
        F: IntoVariadicOperation<Args>,
    {
        BuiltinOp {
            scheme_id,
            func: builtin_variadic::<Args, F>(f, arity),
            arity,
        }
    }

    vec![
        // Arithmetic operations
        variadic::<(Rest<Number>,), _>("+", Arity::Any, builtin_add),
        variadic::<(Number, Rest<Number>), _>("-", Arity::AtLeast(1), builtin_sub),
        variadic::<(Rest<Number>,), _>("*", Arity::Any, builtin_mul),
        fixed::<(Number, Number), _>("/", 2, builtin_div),
        fixed::<(Number, Number), _>("mod", 2, builtin_mod),
        // Comparison operations
        variadic::<(Value, Rest<Value>), _>(">", Arity::AtLeast(2), builtin_gt),
        variadic::<(Value, Rest<Value>), _>(">=", Arity::AtLeast(2), builtin_ge),
        variadic::<(Value, Rest<Value>), _>("<", Arity::AtLeast(2), builtin_lt),
        variadic::<(Value, Rest<Value>), _>("<=", Arity::AtLeast(2), builtin_le),
        variadic::<(Value, Rest<Value>), _>("=", Arity::AtLeast(2), builtin_numeric_eq),
        fixed::<(Value, Value), _>("eq?", 2, builtin_eq),
        // List operations
        fixed::<(Value,), _>("null?", 1, builtin_null),
        fixed::<(Vec<Value>,), _>("car", 1, builtin_car),
        fixed::<(Vec<Value>,), _>("cdr", 1, builtin_cdr),
        fixed::<(Value, Vec<Value>), _>("cons", 2, builtin_cons),
        fixed::<(Value,), _>("length", 1, builtin_length),
        // Logical operations
        fixed::<(Value,), _>("not", 1, builtin_not),
        // Higher-order operations
        fixed::<(Value, Vec<Value>), _>("map", 2, builtin_map),
        fixed::<(Value, Vec<Value>), _>("filter", 2, builtin_filter),
        fixed::<(Value, Vec<Value>), _>("apply", 2, builtin_apply),
    ]
}
