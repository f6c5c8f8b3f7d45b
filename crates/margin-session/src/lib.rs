// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # margin-session
//!
//! Persistent per-file evaluation sessions for JavaScript/TypeScript
//! fragments: the engine behind margin's inline REPL.
//!
//! A [`Session`] owns the namespace store, keyed by the absolute path of
//! each user module. Evaluating a fragment in a namespace rewrites it so
//! that every top-level binding, export, and import is reified into the
//! store, executes it against a synthesized scope (resolved imports, prior
//! bindings, CommonJS stubs, host globals), and returns the value of the
//! trailing expression. Later evaluations in the same namespace see what
//! earlier ones defined, so a program can be grown selection by selection
//! without restarting anything.
//!
//! Both module dialects work, in the same file, across files:
//!
//! - ES modules: `import`/`export` including defaults, namespaces
//!   (`import * as x`), and dynamic `import()`
//! - CommonJS: `require`, `module.exports`, `exports.name`, `__filename`,
//!   `__dirname`
//!
//! ## Quick Start
//!
//! ```rust
//! use margin_session::{EvalOptions, Session};
//! use std::path::Path;
//!
//! let session = Session::new();
//! let ns = Path::new("/tmp/scratch.js");
//!
//! session.evaluate(ns, "const x = 10;", EvalOptions::default()).unwrap();
//! let result = session.evaluate(ns, "x * 2", EvalOptions::default()).unwrap();
//! assert_eq!(result.to_js_string(), "20");
//! ```
//!
//! Sessions are single-threaded and clone cheaply; hosts that accept
//! concurrent evaluation requests must serialize them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod host;
pub mod protocol;
pub mod resolver;
pub mod store;

mod evaluate;
mod rewrite;
mod scope;

// Re-exports
pub use error::{EvalError, Result};
pub use evaluate::{EvalOptions, Session};
pub use protocol::{EvalRequest, EvalResponse};

/// Version of the session crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
