use std::rc::Rc;

use crate::Error;
use crate::ast::{Number, Value};
use crate::evaluator::Arity;

// NOTE: This module is internal plumbing for the native procedures.
// It defines the adapter layer that turns strongly-typed Rust
// functions into the erased `OperationFn` stored in
// `Value::NativeProcedure`.
//
// Most callers should go through `Context::register_native_procedure`
// and `Context::register_variadic_native_procedure`.

/// Canonical erased native procedure type used by the evaluator.
///
/// Natives receive ownership of their evaluated argument vector.
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Error>;

// =====================================================================
// Argument conversion
// =====================================================================

/// Conversion from one evaluated argument into a typed Rust parameter.
pub trait FromParam: Sized {
    fn from_arg(value: Value) -> Result<Self, Error>;
}

impl FromParam for Value {
    fn from_arg(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

impl FromParam for Number {
    fn from_arg(value: Value) -> Result<Self, Error> {
        Number::try_from(value)
    }
}

impl FromParam for i64 {
    fn from_arg(value: Value) -> Result<Self, Error> {
        match value {
            Value::Integer(n) => Ok(n),
            other => Err(type_error("integer", &other)),
        }
    }
}

impl FromParam for bool {
    fn from_arg(value: Value) -> Result<Self, Error> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(type_error("boolean", &other)),
        }
    }
}

impl FromParam for String {
    fn from_arg(value: Value) -> Result<Self, Error> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(type_error("string", &other)),
        }
    }
}

/// A list argument, taken by value
impl FromParam for Vec<Value> {
    fn from_arg(value: Value) -> Result<Self, Error> {
        match value {
            Value::List(items) => Ok(items),
            other => Err(type_error("list", &other)),
        }
    }
}

fn type_error(expected: &str, got: &Value) -> Error {
    Error::TypeError(format!(
        "expected {expected}, got {}: {got}",
        got.type_name()
    ))
}

// =====================================================================
// Return-type adaptation
// =====================================================================

/// Normalizes native return types to the canonical `Result<Value, Error>`.
pub trait IntoValueResult {
    fn into_value_result(self) -> Result<Value, Error>;
}

impl<T> IntoValueResult for Result<T, Error>
where
    T: Into<Value>,
{
    fn into_value_result(self) -> Result<Value, Error> {
        self.map(Into::into)
    }
}

impl<T> IntoValueResult for T
where
    T: Into<Value>,
{
    fn into_value_result(self) -> Result<Value, Error> {
        Ok(self.into())
    }
}

// =====================================================================
// Fixed-arity adapters
// =====================================================================

/// Converts a strongly-typed Rust function or closure into the erased
/// [`OperationFn`], parameterized by its argument tuple type. Arity is
/// enforced from the signature.
pub trait IntoOperation<Args> {
    fn into_operation(self) -> Rc<OperationFn>;
}

impl<F, R> IntoOperation<()> for F
where
    F: Fn() -> R + 'static,
    R: IntoValueResult,
{
    fn into_operation(self) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Value>| {
            if !args.is_empty() {
                return Err(Error::arity_error(0, args.len()));
            }
            (self)().into_value_result()
        })
    }
}

macro_rules! impl_into_operation_for_arity {
    ($arity:expr, $( $v:ident : $A:ident ),+ ) => {
        impl<F, R, $( $A ),+> IntoOperation<( $( $A, )+ )> for F
        where
            F: Fn( $( $A ),+ ) -> R + 'static,
            $( $A: FromParam, )+
            R: IntoValueResult,
        {
            fn into_operation(self) -> Rc<OperationFn> {
                Rc::new(move |args: Vec<Value>| {
                    match <[Value; $arity]>::try_from(args) {
                        Ok([ $( $v ),+ ]) => {
                            let result: R = (self)( $( <$A as FromParam>::from_arg($v)? ),+ );
                            result.into_value_result()
                        }
                        Err(args) => Err(Error::arity_error($arity, args.len())),
                    }
                })
            }
        }
    };
}

impl_into_operation_for_arity!(1, v0: A1);
impl_into_operation_for_arity!(2, v0: A1, v1: A2);
impl_into_operation_for_arity!(3, v0: A1, v1: A2, v2: A3);
impl_into_operation_for_arity!(4, v0: A1, v1: A2, v2: A3, v3: A4);

// =====================================================================
// Variadic adapters
// =====================================================================

/// Marker for a rest parameter whose elements convert through [`FromParam`].
/// The function itself receives a `Vec<T>`.
pub struct Rest<T>(std::marker::PhantomData<T>);

/// Like [`IntoOperation`], for functions whose last parameter collects all
/// remaining arguments. The total argument count is checked against an
/// explicit [`Arity`], since it cannot be derived from the signature.
pub trait IntoVariadicOperation<Args> {
    fn into_variadic_operation(self, arity: Arity) -> Rc<OperationFn>;
}

impl<F, R, T> IntoVariadicOperation<(Rest<T>,)> for F
where
    F: Fn(Vec<T>) -> R + 'static,
    T: FromParam,
    R: IntoValueResult,
{
    fn into_variadic_operation(self, arity: Arity) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            let rest = args
                .into_iter()
                .map(T::from_arg)
                .collect::<Result<Vec<T>, Error>>()?;
            (self)(rest).into_value_result()
        })
    }
}

impl<F, R, A1, T> IntoVariadicOperation<(A1, Rest<T>)> for F
where
    F: Fn(A1, Vec<T>) -> R + 'static,
    A1: FromParam,
    T: FromParam,
    R: IntoValueResult,
{
    fn into_variadic_operation(self, arity: Arity) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            let mut args = args.into_iter();
            let Some(first) = args.next() else {
                return Err(Error::arity_error(1, 0));
            };
            let first = A1::from_arg(first)?;
            let rest = args.map(T::from_arg).collect::<Result<Vec<T>, Error>>()?;
            (self)(first, rest).into_value_result()
        })
    }
}
