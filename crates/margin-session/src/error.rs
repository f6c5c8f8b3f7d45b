// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the evaluation session

use std::path::PathBuf;
use thiserror::Error;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while evaluating a fragment.
///
/// Runtime errors thrown by the user's own code are not represented here:
/// the evaluator catches them, logs a diagnostic, and yields `undefined`,
/// so a typo never kills the session.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A module specifier could not be resolved to a file or a built-in
    #[error("Cannot resolve module '{specifier}' from '{importer}'")]
    Resolve {
        /// The specifier as written in the source
        specifier: String,
        /// The importing module
        importer: PathBuf,
    },

    /// An export registration referenced a local binding that does not exist
    #[error("Export '{exported}' refers to missing local '{local}' in '{namespace}'")]
    MissingLocal {
        /// The namespace the export was registered in
        namespace: PathBuf,
        /// The missing local binding name
        local: String,
        /// The outward-facing export name
        exported: String,
    },

    /// The source uses a construct the rewriter does not handle
    #[error("Unsupported syntax: {0}")]
    Unsupported(String),

    /// The source could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// Maps an engine parse failure into the session taxonomy. The parser
    /// flags constructs it recognizes but deliberately rejects (re-exports,
    /// class inheritance) distinctly from malformed source.
    pub(crate) fn from_parse(err: margin_engine::Error) -> Self {
        let message = err.message();
        if message.contains("not supported") {
            Self::Unsupported(message)
        } else {
            Self::Parse(message)
        }
    }
}
