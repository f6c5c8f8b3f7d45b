// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The evaluation request/response shape consumed by editor transports.
//!
//! The transport itself (HTTP, editor RPC) lives outside this crate; these
//! are just the serde types plus the glue that runs a request against a
//! session and packages the outcome.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::rc::Rc;

use margin_engine::Value;

use crate::{EvalOptions, Session};

/// One evaluation request from the editor integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    /// The selected source fragment
    pub code: String,
    /// Absolute path of the file the selection was taken from
    #[serde(rename = "modulePath")]
    pub module_path: PathBuf,
}

/// The engine's answer to one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResponse {
    /// The evaluation result, coerced to JSON (string form when the value
    /// does not serialize cleanly)
    pub result: serde_json::Value,
    /// Console output captured during the call
    pub stdout: String,
    /// Console errors captured during the call, plus any fatal
    /// session error
    pub stderr: String,
}

impl Session {
    /// Runs one request and packages the result with the console output
    /// captured around the call. Fatal session errors surface in `stderr`
    /// with a null result; the session itself survives.
    pub fn handle(&self, request: &EvalRequest) -> EvalResponse {
        let outcome = self.evaluate(
            &request.module_path,
            &request.code,
            EvalOptions::default(),
        );
        let (stdout, mut stderr) = self.drain_console();

        let result = match outcome {
            Ok(value) => value_to_json(&value),
            Err(err) => {
                stderr.push_str(&err.to_string());
                stderr.push('\n');
                serde_json::Value::Null
            }
        };

        EvalResponse {
            result,
            stdout,
            stderr,
        }
    }
}

/// Coerces an engine value to JSON. Functions and other values with no
/// clean serialization become their display string; circular references
/// degrade to a marker rather than recursing.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    let mut seen = Vec::new();
    convert(value, &mut seen)
}

fn convert(value: &Value, seen: &mut Vec<*const ()>) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => match serde_json::Number::from_f64(*n) {
            Some(number) => serde_json::Value::Number(number),
            None => serde_json::Value::String(value.to_js_string()),
        },
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Function(_) => serde_json::Value::String(value.to_js_string()),
        Value::Object(obj) => {
            let ptr = Rc::as_ptr(obj) as *const ();
            if seen.contains(&ptr) {
                return serde_json::Value::String("[Circular]".to_string());
            }
            seen.push(ptr);

            let borrowed = obj.borrow();
            let converted = if borrowed.is_array() {
                serde_json::Value::Array(
                    borrowed
                        .elements
                        .iter()
                        .map(|element| convert(element, seen))
                        .collect(),
                )
            } else {
                let mut map = serde_json::Map::new();
                let mut keys: Vec<&String> = borrowed.properties.keys().collect();
                keys.sort();
                for key in keys {
                    map.insert(key.clone(), convert(&borrowed.properties[key], seen));
                }
                serde_json::Value::Object(map)
            };

            seen.pop();
            converted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape_round_trips() {
        let request: EvalRequest =
            serde_json::from_str(r#"{ "code": "1 + 1", "modulePath": "/tmp/a.js" }"#).unwrap();
        assert_eq!(request.code, "1 + 1");
        assert_eq!(request.module_path, PathBuf::from("/tmp/a.js"));

        let text = serde_json::to_string(&request).unwrap();
        assert!(text.contains("modulePath"));
    }

    #[test]
    fn test_handle_returns_result_and_console() {
        let session = Session::new();
        let response = session.handle(&EvalRequest {
            code: "console.log('hi'); 2 + 3".to_string(),
            module_path: PathBuf::from("/tmp/protocol-test.js"),
        });
        assert_eq!(response.result, serde_json::json!(5.0));
        assert_eq!(response.stdout, "hi\n");
        assert_eq!(response.stderr, "");
    }

    #[test]
    fn test_handle_surfaces_fatal_errors_in_stderr() {
        let session = Session::new();
        let response = session.handle(&EvalRequest {
            code: "export { ghost };".to_string(),
            module_path: PathBuf::from("/tmp/protocol-test-2.js"),
        });
        assert_eq!(response.result, serde_json::Value::Null);
        assert!(response.stderr.contains("ghost"));
    }

    #[test]
    fn test_function_results_coerce_to_string_form() {
        let session = Session::new();
        let response = session.handle(&EvalRequest {
            code: "function hi() { return 1; }\nhi".to_string(),
            module_path: PathBuf::from("/tmp/protocol-test-3.js"),
        });
        assert_eq!(
            response.result,
            serde_json::Value::String("[Function: hi]".to_string())
        );
    }
}
