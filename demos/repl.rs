//! Interactive driver for the interpreter.
//!
//! `cargo run --example repl` starts a line-editing REPL. With file arguments
//! (`cargo run --example repl -- a.scm b.scm`) each file is evaluated in one
//! shared context and its result printed after a `; <file>` header.
//!
//! Set `RUST_LOG=picoscheme=trace` to watch evaluation.

use picoscheme::ast::Value;
use picoscheme::{Context, ParseConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::{env, fs, panic, process};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let files: Vec<String> = env::args().skip(1).collect();

    let result = panic::catch_unwind(|| {
        if files.is_empty() {
            run_repl();
            0
        } else {
            run_files(&files)
        }
    });

    match result {
        Ok(code) => process::exit(code),
        Err(panic_info) => {
            eprintln!("The interpreter encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

fn context() -> Context {
    Context::with_config(ParseConfig {
        handle_comments: true,
    })
}

/// Evaluate each file in order; stops at the first failure.
fn run_files(files: &[String]) -> i32 {
    let ctx = context();

    for path in files {
        println!("; {path}");
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Error: cannot read {path}: {err}");
                return 1;
            }
        };
        match ctx.evaluate(&source) {
            Ok(value) => println!("{value}"),
            Err(err) => {
                eprintln!("Error: {err}");
                return 1;
            }
        }
    }

    0
}

fn run_repl() {
    println!("picoscheme");
    println!("Enter expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let ctx = context();

    loop {
        match rl.readline("scheme> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&ctx);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match ctx.evaluate(line) {
                    Ok(result) => println!("{result}"),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show the root frame bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Special forms:");
    println!("  quote progn if cond set define lambda let and or");
    println!("  `x is shorthand for (quote x); ; starts a comment");
    println!();
    println!("Examples:");
    println!("  (define (square x) (* x x))");
    println!("  (map square `(1 2 3))");
    println!("  (let ((a 2) (b 3)) (if (< a b) b a))");
    println!("  (eval `(+ 4 1))");
    println!();
}

fn print_environment(ctx: &Context) {
    let bindings = ctx.frame().get_all_bindings();

    // Separate native procedures from user-defined values
    let mut natives = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::NativeProcedure { .. } => natives.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !natives.is_empty() {
        println!("Native procedures ({}):", natives.len());
        let mut col = 0;
        for name in natives {
            print!("  {:<10}", name.name());
            col += 1;
            if col % 6 == 0 {
                println!();
            }
        }
        if col % 6 != 0 {
            println!();
        }
        println!();
    }

    if user_defined.is_empty() {
        println!("No user-defined values.");
    } else {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
