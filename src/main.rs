// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Margin - an inline REPL for JavaScript and TypeScript source files
//!
//! This is the main entry point. With a file argument the file is evaluated
//! in its own namespace and the result printed; without one, the
//! interactive REPL starts.

mod repl;

use margin_session::{EvalOptions, Session};
use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut file: Option<PathBuf> = None;
    let mut eval_imports = false;
    for arg in &args {
        match arg.as_str() {
            "--eval-imports" => eval_imports = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--version" | "-V" => {
                println!("margin {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            other if !other.starts_with('-') => file = Some(PathBuf::from(other)),
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage();
                std::process::exit(2);
            }
        }
    }

    match file {
        Some(path) => run_file(&path, eval_imports),
        None => {
            let mut repl = match repl::Repl::new() {
                Ok(repl) => repl,
                Err(err) => {
                    eprintln!("Failed to initialize the REPL: {}", err);
                    std::process::exit(1);
                }
            };
            if let Err(err) = repl.run() {
                eprintln!("REPL error: {}", err);
                std::process::exit(1);
            }
        }
    }
}

fn run_file(path: &PathBuf, eval_imports: bool) {
    let session = Session::new();
    let options = EvalOptions {
        eval_imports,
        debug: false,
    };

    match session.evaluate_file(path, options) {
        Ok(value) => {
            let (stdout, stderr) = session.drain_console();
            print!("{}", stdout);
            eprint!("{}", stderr);
            println!("{}", margin_engine::inspect(&value));
        }
        Err(err) => {
            let (stdout, stderr) = session.drain_console();
            print!("{}", stdout);
            eprint!("{}", stderr);
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Usage: margin [options] [file]");
    println!();
    println!("Options:");
    println!("  --eval-imports  Recursively evaluate imported files");
    println!("  -h, --help      Show this help");
    println!("  -V, --version   Show version");
    println!();
    println!("Without a file argument, margin starts the interactive REPL.");
}
