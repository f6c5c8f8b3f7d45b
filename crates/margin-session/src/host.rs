// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host built-in modules.
//!
//! Any specifier that does not resolve to a file on disk is loaded from this
//! registry. Built-ins never enter the namespace store; a fresh module
//! object is built on every load.

use margin_engine::{inspect, JsFunction, JsObject, Value};
use std::path::{Path, PathBuf};

use crate::error::{EvalError, Result};

/// The registry of host modules.
#[derive(Debug, Default)]
pub struct HostModules;

impl HostModules {
    /// Creates the registry.
    pub fn new() -> Self {
        Self
    }

    /// Whether `id` names a known built-in.
    pub fn contains(&self, id: &str) -> bool {
        matches!(id, "path" | "os" | "fs" | "util")
    }

    /// Builds the module object for a built-in id.
    pub fn load(&self, id: &str, importer: &Path) -> Result<Value> {
        match id {
            "path" => Ok(path_module()),
            "os" => Ok(os_module()),
            "fs" => Ok(fs_module()),
            "util" => Ok(util_module()),
            other => Err(EvalError::Resolve {
                specifier: other.to_string(),
                importer: importer.to_path_buf(),
            }),
        }
    }
}

fn path_module() -> Value {
    let module = JsObject::plain();
    {
        let mut obj = module.borrow_mut();
        obj.set(
            "sep",
            Value::String(std::path::MAIN_SEPARATOR.to_string()),
        );
        obj.set(
            "join",
            native("join", |args| {
                let mut result = PathBuf::new();
                for arg in args {
                    let part = arg.to_js_string();
                    if Path::new(&part).is_absolute() {
                        result = PathBuf::from(part);
                    } else {
                        result.push(part);
                    }
                }
                Value::String(result.to_string_lossy().to_string())
            }),
        );
        obj.set(
            "resolve",
            native("resolve", |args| {
                let mut result =
                    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                for arg in args {
                    let part = arg.to_js_string();
                    if Path::new(&part).is_absolute() {
                        result = PathBuf::from(part);
                    } else {
                        result.push(part);
                    }
                }
                Value::String(result.to_string_lossy().to_string())
            }),
        );
        obj.set(
            "dirname",
            native("dirname", |args| {
                let path = first_string(args);
                Value::String(
                    Path::new(&path)
                        .parent()
                        .map(|p| p.to_string_lossy().to_string())
                        .unwrap_or_else(|| ".".to_string()),
                )
            }),
        );
        obj.set(
            "basename",
            native("basename", |args| {
                let path = first_string(args);
                Value::String(
                    Path::new(&path)
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_default(),
                )
            }),
        );
        obj.set(
            "extname",
            native("extname", |args| {
                let path = first_string(args);
                Value::String(
                    Path::new(&path)
                        .extension()
                        .map(|ext| format!(".{}", ext.to_string_lossy()))
                        .unwrap_or_default(),
                )
            }),
        );
        obj.set(
            "isAbsolute",
            native("isAbsolute", |args| {
                Value::Boolean(Path::new(&first_string(args)).is_absolute())
            }),
        );
    }
    Value::Object(module)
}

fn os_module() -> Value {
    let module = JsObject::plain();
    {
        let mut obj = module.borrow_mut();
        obj.set(
            "EOL",
            Value::String(if cfg!(windows) { "\r\n" } else { "\n" }.to_string()),
        );
        obj.set(
            "platform",
            native("platform", |_args| {
                Value::String(
                    match std::env::consts::OS {
                        "macos" => "darwin",
                        "windows" => "win32",
                        other => other,
                    }
                    .to_string(),
                )
            }),
        );
        obj.set(
            "homedir",
            native("homedir", |_args| {
                Value::String(std::env::var("HOME").unwrap_or_default())
            }),
        );
        obj.set(
            "tmpdir",
            native("tmpdir", |_args| {
                Value::String(std::env::temp_dir().to_string_lossy().to_string())
            }),
        );
    }
    Value::Object(module)
}

fn fs_module() -> Value {
    let module = JsObject::plain();
    {
        let mut obj = module.borrow_mut();
        obj.set(
            "existsSync",
            native("existsSync", |args| {
                Value::Boolean(Path::new(&first_string(args)).exists())
            }),
        );
        obj.set(
            "readFileSync",
            Value::Function(JsFunction::native(
                "readFileSync",
                |interp, _this, args| {
                    let path = first_string(args);
                    match std::fs::read_to_string(&path) {
                        Ok(content) => Ok(Value::String(content)),
                        Err(err) => {
                            let error = JsObject::error(
                                "Error",
                                &format!("ENOENT-like failure reading '{}': {}", path, err),
                            );
                            Err(interp.throw(Value::Object(error)))
                        }
                    }
                },
            )),
        );
        obj.set(
            "writeFileSync",
            Value::Function(JsFunction::native(
                "writeFileSync",
                |interp, _this, args| {
                    let path = first_string(args);
                    let content = args.get(1).map(|v| v.to_js_string()).unwrap_or_default();
                    match std::fs::write(&path, content) {
                        Ok(()) => Ok(Value::Undefined),
                        Err(err) => {
                            let error = JsObject::error(
                                "Error",
                                &format!("failed writing '{}': {}", path, err),
                            );
                            Err(interp.throw(Value::Object(error)))
                        }
                    }
                },
            )),
        );
        obj.set(
            "readdirSync",
            Value::Function(JsFunction::native(
                "readdirSync",
                |interp, _this, args| {
                    let path = first_string(args);
                    match std::fs::read_dir(&path) {
                        Ok(entries) => {
                            let mut names: Vec<Value> = entries
                                .filter_map(|entry| entry.ok())
                                .map(|entry| {
                                    Value::String(entry.file_name().to_string_lossy().to_string())
                                })
                                .collect();
                            names.sort_by(|a, b| a.to_js_string().cmp(&b.to_js_string()));
                            Ok(Value::Object(JsObject::array(names)))
                        }
                        Err(err) => {
                            let error = JsObject::error(
                                "Error",
                                &format!("failed reading dir '{}': {}", path, err),
                            );
                            Err(interp.throw(Value::Object(error)))
                        }
                    }
                },
            )),
        );
    }
    Value::Object(module)
}

fn util_module() -> Value {
    let module = JsObject::plain();
    {
        let mut obj = module.borrow_mut();
        obj.set(
            "inspect",
            native("inspect", |args| {
                Value::String(
                    args.first()
                        .map(inspect)
                        .unwrap_or_else(|| "undefined".to_string()),
                )
            }),
        );
        obj.set(
            "format",
            native("format", |args| {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(match arg {
                        Value::String(s) => s.clone(),
                        other => inspect(other),
                    });
                }
                Value::String(parts.join(" "))
            }),
        );
    }
    Value::Object(module)
}

/// Wraps a pure function as a native function value.
fn native(name: &str, f: impl Fn(&[Value]) -> Value + 'static) -> Value {
    Value::Function(JsFunction::native(name, move |_interp, _this, args| {
        Ok(f(args))
    }))
}

fn first_string(args: &[Value]) -> String {
    args.first().map(|v| v.to_js_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains() {
        let host = HostModules::new();
        assert!(host.contains("fs"));
        assert!(host.contains("path"));
        assert!(!host.contains("left-pad"));
    }

    #[test]
    fn test_unknown_builtin_is_resolve_error() {
        let host = HostModules::new();
        let err = host
            .load("left-pad", Path::new("/tmp/app.js"))
            .unwrap_err();
        assert!(matches!(err, EvalError::Resolve { specifier, .. } if specifier == "left-pad"));
    }

    #[test]
    fn test_fresh_object_per_load() {
        let host = HostModules::new();
        let a = host.load("path", Path::new("/tmp/app.js")).unwrap();
        let b = host.load("path", Path::new("/tmp/app.js")).unwrap();
        assert!(!a.strict_equals(&b));
    }
}
