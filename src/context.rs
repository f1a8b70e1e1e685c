use std::rc::Rc;

use tracing::debug;

use crate::Error;
use crate::ast::{Symbol, Value};
use crate::evaluator::frame::Frame;
use crate::evaluator::intooperation::{IntoOperation, IntoVariadicOperation};
use crate::evaluator::{Arity, create_global_env, eval};
use crate::lexer::ParseConfig;
use crate::parser::parse_with_config;

/// An evaluation session: a persistent root frame plus the parser settings.
///
/// Definitions made by one call to [`Context::evaluate`] are visible to the
/// next. An error aborts the current call only; bindings made before it stay
/// in place and the context remains usable.
pub struct Context {
    frame: Rc<Frame>,
    config: ParseConfig,
}

impl Context {
    pub fn new() -> Self {
        Self::with_config(ParseConfig::default())
    }

    pub fn with_config(config: ParseConfig) -> Self {
        let frame = Rc::new(create_global_env());

        // `eval` reaches the root frame through a weak link, since the frame
        // itself holds the procedure.
        let root = Rc::downgrade(&frame);
        let eval_in_root = move |expr: Value| -> Result<Value, Error> {
            let frame = root
                .upgrade()
                .ok_or_else(|| Error::EvalError("eval: context has been dropped".into()))?;
            eval(&expr, &frame)
        };
        frame.bind(
            Symbol::new("eval"),
            Value::NativeProcedure {
                id: "eval".to_owned(),
                func: IntoOperation::<(Value,)>::into_operation(eval_in_root),
            },
        );

        Context { frame, config }
    }

    /// Parse `source` and evaluate it in the root frame. Several top-level
    /// forms are evaluated in order and the last value is returned.
    pub fn evaluate(&self, source: &str) -> Result<Value, Error> {
        debug!(source, "evaluate");
        let expr = parse_with_config(source, self.config)?;
        eval(&expr, &self.frame).inspect_err(|err| debug!(%err, "evaluation failed"))
    }

    /// The root frame, holding the natives and every top-level definition
    pub fn frame(&self) -> &Rc<Frame> {
        &self.frame
    }

    pub fn config(&self) -> ParseConfig {
        self.config
    }

    /// Bind a strongly-typed Rust function as a native procedure.
    ///
    /// ```
    /// use picoscheme::{Context, Value};
    ///
    /// fn hypot2(a: i64, b: i64) -> i64 {
    ///     a * a + b * b
    /// }
    ///
    /// let ctx = Context::new();
    /// ctx.register_native_procedure::<_, (i64, i64)>("hypot2", hypot2);
    /// assert_eq!(ctx.evaluate("(hypot2 3 4)").unwrap(), Value::Integer(25));
    /// ```
    ///
    /// Parameters convert through
    /// [`FromParam`](crate::evaluator::intooperation::FromParam): `Value`,
    /// `Number`, `i64`, `bool`, `String` and `Vec<Value>` (a list argument).
    /// The function may return any `R: Into<Value>` or `Result<R, Error>`.
    /// Arity follows from the signature; a mismatch is an
    /// [`Error::ArityError`] and a failed conversion an [`Error::TypeError`].
    pub fn register_native_procedure<F, Args>(&self, name: &str, func: F)
    where
        F: IntoOperation<Args>,
    {
        self.bind_native(name, Value::NativeProcedure {
            id: name.to_owned(),
            func: func.into_operation(),
        });
    }

    /// Bind a native procedure whose last parameter collects the remaining
    /// arguments, written as [`Rest<T>`](crate::evaluator::intooperation::Rest)
    /// in `Args` and received as a `Vec<T>`. The total argument count is
    /// checked against `arity`.
    pub fn register_variadic_native_procedure<F, Args>(&self, name: &str, arity: Arity, func: F)
    where
        F: IntoVariadicOperation<Args>,
    {
        self.bind_native(name, Value::NativeProcedure {
            id: name.to_owned(),
            func: func.into_variadic_operation(arity),
        });
    }

    fn bind_native(&self, name: &str, procedure: Value) {
        debug!(name, "register native procedure");
        self.frame.bind(Symbol::new(name), procedure);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{Number, nil, sym, val};
    use crate::evaluator::intooperation::Rest;
    use pretty_assertions::assert_eq;

    fn evaluate_all(ctx: &Context, sources: &[&str]) -> Value {
        let mut result = nil();
        for source in sources {
            result = ctx.evaluate(source).unwrap();
        }
        result
    }

    #[test]
    fn test_evaluate_data_driven() {
        let test_cases: Vec<(Vec<&str>, Value)> = vec![
            (vec!["123"], val(123)),
            (vec!["(+ 2 3)"], val(5)),
            (vec!["(- 2 3)"], val(-1)),
            (vec!["(null? ())"], val(true)),
            (vec!["(cons 1 `(2 3))"], val([1, 2, 3])),
            (vec!["(car `(1 2 3))"], val(1)),
            (vec!["(cdr `(1 2 3))"], val([2, 3])),
            (vec!["(= 2 2.0)"], val(true)),
            (vec!["(eq? 2 2.0)"], val(false)),
            (vec!["(eq? (/ 8 2) 4)"], val(true)),
            (vec!["(eq? (/ 8 2) 4.0)"], val(false)),
            (vec!["(= (/ 8 2) 4.0)"], val(true)),
            (vec!["(not (= 1 1))"], val(false)),
            (vec!["(length `(1 2 3 4))"], val(4)),
            (vec!["(define (+1 x) (+ 1 x))", "(+1 6)"], val(7)),
            (
                vec!["(define (+1 x) (+ 1 x))", "(map +1 `(1 2 3 4))"],
                val([2, 3, 4, 5]),
            ),
            (
                vec![
                    "(define (even? x) (= (mod x 2) 0))",
                    "(filter even? `(1 2 3 4 5 6))",
                ],
                val([2, 4, 6]),
            ),
            (vec!["(apply (lambda (x) (/ x 2)) `(24))"], val(12)),
            (vec!["(eval `(+ 4 1))"], val(5)),
            (vec!["(let ((a (lambda (x y) (+ x y)))) (a 1 2))"], val(3)),
            (vec!["(set x 5)", "(eval `x)"], val(5)),
            (vec!["(eval (quote (quote sym)))"], sym("sym")),
            (vec!["(define (f) 1)"], nil()),
            (vec!["(set y 2)"], nil()),
            (vec![""], nil()),
            (vec!["1\x0c"], val(1)),
            (vec!["(+ 1\x0b2)"], val(3)),
            (vec!["(+ 1\u{a0}2)"], val(3)),
        ];

        for (i, (sources, expected)) in test_cases.into_iter().enumerate() {
            let ctx = Context::new();
            assert_eq!(
                evaluate_all(&ctx, &sources),
                expected,
                "Context test #{} failed for {sources:?}",
                i + 1
            );
        }
    }

    #[test]
    fn test_state_persists_across_calls() {
        let ctx = Context::new();
        ctx.evaluate("(set counter 1)").unwrap();
        ctx.evaluate("(set counter (+ counter 1))").unwrap();
        assert_eq!(ctx.evaluate("counter").unwrap(), val(2));
        assert_eq!(
            ctx.frame().lookup(&Symbol::new("counter")),
            Some(val(2))
        );
    }

    #[test]
    fn test_closure_keeps_let_scope() {
        let ctx = Context::new();
        ctx.evaluate("(set get (let ((hidden 42)) (lambda () hidden)))")
            .unwrap();
        assert_eq!(ctx.evaluate("(get)").unwrap(), val(42));
        assert_eq!(
            ctx.evaluate("hidden"),
            Err(Error::UnboundSymbol("hidden".into()))
        );
    }

    #[test]
    fn test_usable_after_error_without_rollback() {
        let ctx = Context::new();
        assert_eq!(
            ctx.evaluate("(set before 1) (car ()) (set after 2)"),
            Err(Error::IndexError("car of empty list".into()))
        );
        assert_eq!(ctx.evaluate("before").unwrap(), val(1));
        assert_eq!(
            ctx.evaluate("after"),
            Err(Error::UnboundSymbol("after".into()))
        );
        assert_eq!(ctx.evaluate("(+ before 1)").unwrap(), val(2));
    }

    #[test]
    fn test_errors_surface_unchanged() {
        let ctx = Context::new();
        assert!(matches!(ctx.evaluate("(1 2"), Err(Error::ParseError(_))));
        assert!(matches!(
            ctx.evaluate("(a [b])"),
            Err(Error::LexError { found: '[', .. })
        ));
        assert_eq!(
            ctx.evaluate("(car 1 2)"),
            Err(Error::arity_error(1, 2))
        );
        assert!(matches!(
            ctx.evaluate("(if 1 2)"),
            Err(Error::MalformedForm { form: "if", .. })
        ));
    }

    #[test]
    fn test_with_config_enables_comments() {
        let source = "; doubles its argument\n(define (twice x) (* 2 x)) (twice 21)";

        let ctx = Context::with_config(ParseConfig {
            handle_comments: true,
        });
        assert!(ctx.config().handle_comments);
        assert_eq!(ctx.evaluate(source).unwrap(), val(42));

        assert!(matches!(
            Context::new().evaluate(source),
            Err(Error::LexError { found: ';', .. })
        ));
    }

    #[test]
    fn test_eval_native_after_context_dropped() {
        let ctx = Context::new();
        let eval_proc = ctx.evaluate("eval").unwrap();
        drop(ctx);
        assert!(matches!(
            crate::evaluator::apply(&eval_proc, vec![val(1)]),
            Err(Error::EvalError(_))
        ));
    }

    #[test]
    fn test_register_native_procedure() {
        fn add(a: i64, b: i64) -> i64 {
            a + b
        }
        fn safe_div(a: i64, b: i64) -> Result<i64, Error> {
            if b == 0 {
                Err(Error::EvalError("division by zero".into()))
            } else {
                Ok(a / b)
            }
        }

        let ctx = Context::new();
        ctx.register_native_procedure::<_, (i64, i64)>("add2", add);
        ctx.register_native_procedure::<_, (i64, i64)>("safe-div", safe_div);
        ctx.register_native_procedure::<_, ()>("forty-two", || 42);

        assert_eq!(ctx.evaluate("(add2 7 5)").unwrap(), val(12));
        assert_eq!(ctx.evaluate("(forty-two)").unwrap(), val(42));
        assert_eq!(ctx.evaluate("(safe-div 6 3)").unwrap(), val(2));
        assert!(
            format!("{}", ctx.evaluate("(safe-div 1 0)").unwrap_err())
                .contains("division by zero")
        );
        assert_eq!(ctx.evaluate("(add2 1)"), Err(Error::arity_error(2, 1)));
        assert!(matches!(
            ctx.evaluate("(add2 1 \"2\")"),
            Err(Error::TypeError(_))
        ));

        // Natives are first-class: they work with map and apply
        assert_eq!(
            ctx.evaluate("(apply add2 `(1 2))").unwrap(),
            val(3)
        );
    }

    #[test]
    fn test_register_variadic_native_procedure() {
        fn count_numbers(args: Vec<Value>) -> i64 {
            args.iter()
                .filter(|v| matches!(v, Value::Integer(_) | Value::Float(_)))
                .count() as i64
        }
        fn scale_sum(factor: Number, nums: Vec<Number>) -> f64 {
            factor.as_f64() * nums.iter().map(|n| n.as_f64()).sum::<f64>()
        }

        let ctx = Context::new();
        ctx.register_variadic_native_procedure::<_, (Rest<Value>,)>(
            "count-numbers",
            Arity::Any,
            count_numbers,
        );
        ctx.register_variadic_native_procedure::<_, (Number, Rest<Number>)>(
            "scale-sum",
            Arity::AtLeast(2),
            scale_sum,
        );

        assert_eq!(
            ctx.evaluate("(count-numbers 1 \"x\" 2.5 #t)").unwrap(),
            val(2)
        );
        assert_eq!(ctx.evaluate("(count-numbers)").unwrap(), val(0));
        assert_eq!(ctx.evaluate("(scale-sum 2 1 2 3)").unwrap(), val(12.0));
        assert_eq!(
            ctx.evaluate("(scale-sum 2)"),
            Err(Error::arity_error(2, 1))
        );
    }

    #[test]
    fn test_registered_native_shadows_builtin() {
        let ctx = Context::new();
        ctx.register_native_procedure::<_, (Value,)>("car", |_: Value| "replaced");
        assert_eq!(ctx.evaluate("(car `(1))").unwrap(), val("replaced"));
    }
}
