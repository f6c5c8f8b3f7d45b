// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # margin-engine
//!
//! The JavaScript/TypeScript engine behind the margin inline REPL.
//!
//! ## Overview
//!
//! This crate provides the execution substrate the evaluation session is
//! built on:
//! - Lexer and recursive-descent parser for a practical ES subset, with
//!   TypeScript type erasure
//! - ESTree-compatible AST, including import/export declaration nodes
//! - Tree-walking interpreter over shared lexical environments
//! - Built-in globals (console with a pluggable sink, Math, JSON, ...)
//!
//! Module syntax parses but does not execute: callers rewrite
//! import/export declarations into plain statements first (that rewrite
//! lives in the `margin-session` crate).
//!
//! ## Quick Start
//!
//! ```rust
//! use margin_engine::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! let result = engine.eval("1 + 2").unwrap();
//! assert!(matches!(result, Value::Number(n) if n == 3.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;

// Re-exports for convenience
pub use builtins::{inspect, CaptureBuffer, ConsoleSink};
pub use interpreter::Interpreter;
pub use parser::Parser;
pub use runtime::{Environment, FunctionRef, JsFunction, JsObject, ObjectRef, Value};

/// A standalone JavaScript engine instance.
///
/// Wraps a parser and interpreter with a persistent global environment, for
/// callers that just want to evaluate source text. The evaluation session
/// builds its own scope chains instead and drives the interpreter directly.
pub struct Engine {
    interpreter: Interpreter,
}

impl Engine {
    /// Creates a new JavaScript engine instance with default globals.
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// Evaluates JavaScript source code and returns the value of the last
    /// expression.
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        let program = parser::parse(source)?;
        self.interpreter.run(&program)
    }

    /// Evaluates source from a file, erasing types for TypeScript paths.
    pub fn eval_file(&mut self, path: &std::path::Path) -> Result<Value, Error> {
        let source =
            std::fs::read_to_string(path).map_err(|e| Error::Io(e.to_string()))?;
        let is_typescript = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("ts") | Some("tsx") | Some("mts") | Some("cts")
        );
        let program = if is_typescript {
            parser::parse_typescript(&source)?
        } else {
            parser::parse(&source)?
        };
        self.interpreter.run(&program)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during parsing or execution.
#[derive(Debug, Clone)]
pub enum Error {
    /// Syntax error during parsing
    SyntaxError(String),
    /// Type error during execution
    TypeError(String),
    /// Reference error (undefined variable)
    ReferenceError(String),
    /// Range error (out of bounds, etc.)
    RangeError(String),
    /// Internal engine error
    Internal(String),
    /// I/O error
    Io(String),
    /// Marker for a JavaScript `throw`; the thrown value lives in the
    /// interpreter's side slot until a `try` handler (or the host) takes it
    Thrown,
}

impl Error {
    /// The JavaScript-style error name for this kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::SyntaxError(_) => "SyntaxError",
            Error::TypeError(_) => "TypeError",
            Error::ReferenceError(_) => "ReferenceError",
            Error::RangeError(_) => "RangeError",
            Error::Internal(_) => "InternalError",
            Error::Io(_) => "IOError",
            Error::Thrown => "Error",
        }
    }

    /// The bare message, without the error-name prefix.
    pub fn message(&self) -> String {
        match self {
            Error::SyntaxError(msg)
            | Error::TypeError(msg)
            | Error::ReferenceError(msg)
            | Error::RangeError(msg)
            | Error::Internal(msg)
            | Error::Io(msg) => msg.clone(),
            Error::Thrown => "uncaught exception".to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind_name(), self.message())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_eval_arithmetic() {
        let mut engine = Engine::new();
        let result = engine.eval("2 + 2").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 4.0));
    }

    #[test]
    fn test_engine_state_persists() {
        let mut engine = Engine::new();
        engine.eval("let counter = 10;").unwrap();
        let result = engine.eval("counter + 1").unwrap();
        assert!(matches!(result, Value::Number(n) if n == 11.0));
    }

    #[test]
    fn test_engine_syntax_error() {
        let mut engine = Engine::new();
        assert!(matches!(engine.eval("let = ;"), Err(Error::SyntaxError(_))));
    }
}
