//! Whole programs evaluated through the public `Context` API.

#![expect(clippy::unwrap_used)] // test code OK

use picoscheme::ast::{nil, sym, val};
use picoscheme::evaluator::Arity;
use picoscheme::evaluator::intooperation::Rest;
use picoscheme::{Context, ParseConfig, Value};
use pretty_assertions::assert_eq;

fn run(source: &str) -> Value {
    Context::new().evaluate(source).unwrap()
}

#[test]
fn test_recursive_definitions() {
    let test_cases = vec![
        (
            "(define (fact n) (if (<= n 1) 1 (* n (fact (- n 1)))))
             (fact 20)",
            val(2_432_902_008_176_640_000_i64),
        ),
        (
            "(define (fib n) (cond ((< n 2) n) (#t (+ (fib (- n 1)) (fib (- n 2))))))
             (fib 15)",
            val(610),
        ),
        (
            "(define (sum xs) (if (null? xs) 0 (+ (car xs) (sum (cdr xs)))))
             (sum `(1 2 3 4 5))",
            val(15),
        ),
        (
            "(define (rev xs acc) (if (null? xs) acc (rev (cdr xs) (cons (car xs) acc))))
             (rev `(1 2 3) ())",
            val([3, 2, 1]),
        ),
        (
            "(define (gcd a b) (if (= b 0) a (gcd b (mod a b))))
             (gcd 1071 462)",
            val(21),
        ),
    ];

    for (source, expected) in test_cases {
        assert_eq!(run(source), expected, "program: {source}");
    }
}

#[test]
fn test_higher_order_programs() {
    let test_cases = vec![
        (
            "(define (compose f g) (lambda (x) (f (g x))))
             (define (inc x) (+ x 1))
             (define (double x) (* x 2))
             ((compose inc double) 5)",
            val(11),
        ),
        (
            "(define (make-counter) (let ((n 0)) (lambda () (set n (+ n 1)) n)))
             (set c (make-counter))
             (c)",
            val(1),
        ),
        (
            "(define (square x) (* x x))
             (filter (lambda (x) (> x 10)) (map square `(1 2 3 4 5)))",
            val([16, 25]),
        ),
        ("(apply + `(1 2 3 4))", val(10)),
        ("(map (lambda (p) (car p)) `((a 1) (b 2)))", val(vec![sym("a"), sym("b")])),
        ("(apply map (cons car `(((1) (2)))))", val([1, 2])),
    ];

    for (source, expected) in test_cases {
        assert_eq!(run(source), expected, "program: {source}");
    }
}

#[test]
fn test_code_as_data() {
    let ctx = Context::new();
    ctx.evaluate("(set program (cons (quote +) `(1 2 3)))").unwrap();
    assert_eq!(
        ctx.evaluate("program").unwrap(),
        val(vec![sym("+"), val(1), val(2), val(3)])
    );
    assert_eq!(ctx.evaluate("(eval program)").unwrap(), val(6));

    // eval always uses the root frame, not the caller's
    ctx.evaluate("(set x 1)").unwrap();
    assert_eq!(ctx.evaluate("(let ((x 2)) (eval `x))").unwrap(), val(1));
}

#[test]
fn test_set_is_local_to_the_current_frame() {
    let ctx = Context::new();
    ctx.evaluate("(set x 1)").unwrap();
    ctx.evaluate("(define (shadow) (set x 2) x)").unwrap();
    assert_eq!(ctx.evaluate("(shadow)").unwrap(), val(2));
    assert_eq!(ctx.evaluate("x").unwrap(), val(1));
}

#[test]
fn test_program_with_comments() {
    let source = r#"
        ; Greeting helpers
        (define (greet name) (cons "hello" (cons name ())))  ; builds a list
        (greet "world")
    "#;
    let ctx = Context::with_config(ParseConfig {
        handle_comments: true,
    });
    assert_eq!(ctx.evaluate(source).unwrap(), val(["hello", "world"]));
}

#[test]
fn test_results_display_as_scheme() {
    let test_cases = vec![
        ("(cons 1 `(2.5 \"s\" #t))", "(1 2.5 \"s\" #t)"),
        ("(/ 6 4)", "1.5"),
        ("(* 2 1.0)", "2.0"),
        ("(lambda (x) x)", "#<closure>"),
        ("car", "#<native-procedure:car>"),
        ("(set a 1)", "()"),
    ];

    for (source, expected) in test_cases {
        assert_eq!(format!("{}", run(source)), expected, "program: {source}");
    }
}

#[test]
fn test_host_procedures_mix_with_scheme() {
    fn join(separator: String, parts: Vec<String>) -> String {
        parts.join(&separator)
    }

    let ctx = Context::new();
    ctx.register_variadic_native_procedure::<_, (String, Rest<String>)>(
        "join",
        Arity::AtLeast(1),
        join,
    );
    ctx.evaluate("(define (words) `(\"a\" \"b\" \"c\"))").unwrap();
    assert_eq!(
        ctx.evaluate("(apply join (cons \"-\" (words)))").unwrap(),
        val("a-b-c")
    );
    assert_eq!(ctx.evaluate("(join \",\")").unwrap(), val(""));
}

#[test]
fn test_empty_program() {
    assert_eq!(run(""), nil());
    assert_eq!(run("  \n "), nil());
}
