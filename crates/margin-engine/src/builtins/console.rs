//! The console object, with a pluggable output sink.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::object::ObjectKind;
use crate::runtime::{Environment, JsFunction, JsObject, Value};

/// Captured console output for one evaluation.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    /// Everything written via `console.log`/`console.info`
    pub stdout: String,
    /// Everything written via `console.error`/`console.warn`
    pub stderr: String,
}

/// Where console output goes: the process stdio, or a capture buffer.
#[derive(Clone, Default)]
pub struct ConsoleSink {
    capture: Option<Rc<RefCell<CaptureBuffer>>>,
}

impl ConsoleSink {
    /// A sink that writes straight to the process stdout/stderr.
    pub fn stdio() -> Self {
        Self { capture: None }
    }

    /// A sink that accumulates output into a shared buffer.
    pub fn capture() -> (Self, Rc<RefCell<CaptureBuffer>>) {
        let buffer = Rc::new(RefCell::new(CaptureBuffer::default()));
        (
            Self {
                capture: Some(Rc::clone(&buffer)),
            },
            buffer,
        )
    }

    fn write_out(&self, line: &str) {
        match &self.capture {
            Some(buffer) => {
                let mut buffer = buffer.borrow_mut();
                buffer.stdout.push_str(line);
                buffer.stdout.push('\n');
            }
            None => println!("{}", line),
        }
    }

    fn write_err(&self, line: &str) {
        match &self.capture {
            Some(buffer) => {
                let mut buffer = buffer.borrow_mut();
                buffer.stderr.push_str(line);
                buffer.stderr.push('\n');
            }
            None => eprintln!("{}", line),
        }
    }
}

/// Installs `console` into the environment.
pub fn install(env: &Environment, sink: ConsoleSink) {
    let console = JsObject::plain();

    let stdout_sink = sink.clone();
    let log = JsFunction::native("log", move |_interp, _this, args| {
        stdout_sink.write_out(&format_args_line(args));
        Ok(Value::Undefined)
    });
    let stdout_sink = sink.clone();
    let info = JsFunction::native("info", move |_interp, _this, args| {
        stdout_sink.write_out(&format_args_line(args));
        Ok(Value::Undefined)
    });
    let stderr_sink = sink.clone();
    let warn = JsFunction::native("warn", move |_interp, _this, args| {
        stderr_sink.write_err(&format_args_line(args));
        Ok(Value::Undefined)
    });
    let stderr_sink = sink;
    let error = JsFunction::native("error", move |_interp, _this, args| {
        stderr_sink.write_err(&format_args_line(args));
        Ok(Value::Undefined)
    });

    {
        let mut obj = console.borrow_mut();
        obj.set("log", Value::Function(log));
        obj.set("info", Value::Function(info));
        obj.set("warn", Value::Function(warn));
        obj.set("error", Value::Function(error));
    }

    env.declare("console", Value::Object(console), false);
}

fn format_args_line(args: &[Value]) -> String {
    args.iter()
        .map(|arg| match arg {
            // Bare strings print raw, like Node's console
            Value::String(s) => s.clone(),
            other => inspect(other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders a value for display: strings quoted, arrays and objects expanded
/// one level deep with cycle protection.
pub fn inspect(value: &Value) -> String {
    let mut seen = Vec::new();
    inspect_inner(value, &mut seen, 0)
}

fn inspect_inner(value: &Value, seen: &mut Vec<*const ()>, depth: usize) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Object(obj) => {
            let ptr = Rc::as_ptr(obj) as *const ();
            if seen.contains(&ptr) {
                return "[Circular]".to_string();
            }
            if depth > 3 {
                let borrowed = obj.borrow();
                return if borrowed.is_array() {
                    "[Array]".to_string()
                } else {
                    "[Object]".to_string()
                };
            }
            seen.push(ptr);

            let borrowed = obj.borrow();
            let rendered = if borrowed.is_array() {
                let parts: Vec<String> = borrowed
                    .elements
                    .iter()
                    .map(|element| inspect_inner(element, seen, depth + 1))
                    .collect();
                format!("[ {} ]", parts.join(", "))
            } else if borrowed.kind == ObjectKind::Error {
                value.to_js_string()
            } else {
                let mut parts: Vec<String> = borrowed
                    .properties
                    .iter()
                    .map(|(key, val)| format!("{}: {}", key, inspect_inner(val, seen, depth + 1)))
                    .collect();
                parts.sort();
                if parts.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", parts.join(", "))
                }
            };

            seen.pop();
            rendered
        }
        other => other.to_js_string(),
    }
}
