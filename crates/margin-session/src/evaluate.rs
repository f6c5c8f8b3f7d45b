// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The evaluator: drives rewrite → recursive imports → scope synthesis →
//! execution, against a persistent session.

use margin_engine::builtins::{CaptureBuffer, ConsoleSink};
use margin_engine::{parser, Interpreter, JsObject, Value};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{EvalError, Result};
use crate::host::HostModules;
use crate::resolver::{ModuleResolver, Resolution};
use crate::rewrite;
use crate::scope::{self, namespace_object, SynthesizedScope};
use crate::store::NamespaceStore;

/// Options for one evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalOptions {
    /// Recursively evaluate imported user modules that have not been
    /// evaluated yet. Off by default: imports still register, but their
    /// targets stay empty until evaluated explicitly.
    pub eval_imports: bool,
    /// Dump rewritten programs through `tracing` at debug level.
    pub debug: bool,
}

impl EvalOptions {
    /// Options with recursive import evaluation enabled.
    pub fn with_imports() -> Self {
        Self {
            eval_imports: true,
            debug: false,
        }
    }
}

/// A persistent evaluation session: the namespace store plus the resolver
/// and host-module registry it is consulted with.
///
/// Sessions clone cheaply (shared interior) so the native functions
/// injected into synthesized scopes can reach the same store. A session is
/// single-threaded by design; hosts serialize concurrent requests.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

struct SessionInner {
    store: RefCell<NamespaceStore>,
    resolver: ModuleResolver,
    host: HostModules,
    sink: ConsoleSink,
    capture: Rc<RefCell<CaptureBuffer>>,
    /// Fatal error raised by a registration native mid-execution; takes
    /// precedence over the runtime error that carried it out.
    pending: RefCell<Option<EvalError>>,
    synthetic_ids: Cell<usize>,
}

impl Session {
    /// Creates an empty session. Console output from evaluated fragments is
    /// captured per call; drain it with [`Session::drain_console`].
    pub fn new() -> Self {
        let (sink, capture) = ConsoleSink::capture();
        Self {
            inner: Rc::new(SessionInner {
                store: RefCell::new(NamespaceStore::new()),
                resolver: ModuleResolver::new(),
                host: HostModules::new(),
                sink,
                capture,
                pending: RefCell::new(None),
                synthetic_ids: Cell::new(0),
            }),
        }
    }

    /// Evaluates a source fragment in the given namespace.
    ///
    /// The namespace is the absolute path of the file the fragment belongs
    /// to; it does not need to exist on disk. Later evaluations in the same
    /// namespace see bindings registered by earlier ones.
    ///
    /// Runtime errors thrown by the fragment are logged and yield
    /// `undefined`; resolution, parse, and export-registration failures are
    /// returned as errors.
    pub fn evaluate(&self, namespace: &Path, code: &str, options: EvalOptions) -> Result<Value> {
        let namespace = canonical_namespace(namespace);

        // Mark before touching any import so that cycles terminate.
        self.store_mut().touch(&namespace);

        let parsed = if is_typescript_path(&namespace) {
            parser::parse_typescript(code)
        } else {
            parser::parse(code)
        };
        let program = parsed.map_err(EvalError::from_parse)?;

        let rewritten =
            rewrite::rewrite_program(self, &namespace, program, options.eval_imports)?;
        if options.debug {
            tracing::debug!(
                namespace = %namespace.display(),
                program = ?rewritten.program,
                "rewritten fragment"
            );
        }

        for target in &rewritten.pending_imports {
            if !self.store().has_been_evaluated(target) {
                self.evaluate_file(target, options)?;
            }
        }

        let scope = scope::synthesize(self, &namespace, options)?;
        let mut interpreter = Interpreter::with_scope(scope.env.child());

        let result = match interpreter.run_module(&rewritten.program) {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Some(fatal) = self.inner.pending.borrow_mut().take() {
                    return Err(fatal);
                }
                let detail = match err {
                    margin_engine::Error::Thrown => interpreter
                        .take_thrown()
                        .map(|value| value.to_js_string())
                        .unwrap_or_else(|| "uncaught exception".to_string()),
                    other => other.to_string(),
                };
                tracing::error!(
                    namespace = %namespace.display(),
                    "uncaught error in evaluated fragment: {detail}"
                );
                Ok(Value::Undefined)
            }
        };

        self.commit_cjs_exports(&namespace, &scope)?;
        result
    }

    /// Reads and evaluates a file in its own namespace. `.json` files load
    /// as data and become their namespace's default export.
    pub fn evaluate_file(&self, path: &Path, options: EvalOptions) -> Result<Value> {
        let path = canonical_namespace(path);
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            return self.load_json_module(&path);
        }
        let source = std::fs::read_to_string(&path)?;
        self.evaluate(&path, &source, options)
    }

    /// Clears all namespaces.
    pub fn reset(&self) {
        self.store_mut().reset();
        *self.inner.pending.borrow_mut() = None;
    }

    /// Takes the console output captured since the last drain.
    pub fn drain_console(&self) -> (String, String) {
        let mut capture = self.inner.capture.borrow_mut();
        (
            std::mem::take(&mut capture.stdout),
            std::mem::take(&mut capture.stderr),
        )
    }

    /// Reads a binding's current value (mainly for tests and tooling).
    pub fn binding(&self, namespace: &Path, local: &str) -> Option<Value> {
        self.store().binding(&canonical_namespace(namespace), local)
    }

    /// Reads a namespace's current default-export value.
    pub fn default_export(&self, namespace: &Path) -> Option<Value> {
        self.store().default_export(&canonical_namespace(namespace))
    }

    // --- crate-internal plumbing ---

    pub(crate) fn store(&self) -> Ref<'_, NamespaceStore> {
        self.inner.store.borrow()
    }

    pub(crate) fn store_mut(&self) -> RefMut<'_, NamespaceStore> {
        self.inner.store.borrow_mut()
    }

    pub(crate) fn host(&self) -> &HostModules {
        &self.inner.host
    }

    pub(crate) fn console_sink(&self) -> ConsoleSink {
        self.inner.sink.clone()
    }

    pub(crate) fn resolve(&self, specifier: &str, importer: &Path) -> Result<Resolution> {
        self.inner.resolver.resolve(specifier, importer)
    }

    /// Parks a fatal session error and returns the opaque engine error that
    /// unwinds execution. User `try`/`catch` cannot intercept it, and the
    /// evaluator re-raises the parked error afterwards.
    pub(crate) fn defer(&self, err: EvalError) -> margin_engine::Error {
        let message = err.to_string();
        *self.inner.pending.borrow_mut() = Some(err);
        margin_engine::Error::Internal(message)
    }

    /// `require(specifier)`: built-ins load from the host registry; user
    /// modules optionally evaluate recursively, then yield their
    /// default-export value (or `undefined`).
    pub(crate) fn require_value(
        &self,
        importer: &Path,
        specifier: &str,
        options: EvalOptions,
    ) -> Result<Value> {
        match self.resolve(specifier, importer)? {
            Resolution::BuiltIn(id) => self.host().load(&id, importer),
            Resolution::User(path) => {
                if options.eval_imports && !self.store().has_been_evaluated(&path) {
                    self.evaluate_file(&path, options)?;
                }
                Ok(self
                    .store()
                    .default_export(&path)
                    .unwrap_or(Value::Undefined))
            }
        }
    }

    /// `import(specifier)`: like an `import * as` of the target, resolved
    /// through the same rules.
    pub(crate) fn dynamic_import_value(
        &self,
        importer: &Path,
        specifier: &str,
        options: EvalOptions,
    ) -> Result<Value> {
        match self.resolve(specifier, importer)? {
            Resolution::BuiltIn(id) => self.host().load(&id, importer),
            Resolution::User(path) => {
                if options.eval_imports && !self.store().has_been_evaluated(&path) {
                    self.evaluate_file(&path, options)?;
                }
                Ok(namespace_object(&self.store(), &path))
            }
        }
    }

    /// The `module.exports` sweep. A replaced value, or a freshly seeded
    /// object that gained members, becomes the namespace's default export
    /// under a synthesized binding.
    fn commit_cjs_exports(&self, namespace: &Path, scope: &SynthesizedScope) -> Result<()> {
        let current = scope
            .module
            .borrow()
            .get_own("exports")
            .unwrap_or(Value::Undefined);

        if current.strict_equals(&scope.seeded_exports) {
            if !scope.seed_is_fresh {
                // The pre-existing default export was mutated in place (or
                // untouched); the store already points at it.
                return Ok(());
            }
            let gained_members = match &current {
                Value::Object(obj) => {
                    let borrowed = obj.borrow();
                    !borrowed.properties.is_empty() || !borrowed.elements.is_empty()
                }
                _ => false,
            };
            if !gained_members {
                return Ok(());
            }
        }

        let id = format!("__moduleExports_{}", self.inner.synthetic_ids.get());
        self.inner.synthetic_ids.set(self.inner.synthetic_ids.get() + 1);

        let mut store = self.store_mut();
        store.put_binding(namespace, &id, current);
        store.put_default_export(namespace, &id)
    }

    /// Loads a `.json` file as a module: parse, bind, export as default.
    fn load_json_module(&self, path: &Path) -> Result<Value> {
        if let Some(existing) = self.store().default_export(path) {
            return Ok(existing);
        }

        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content).map_err(|err| {
            EvalError::Parse(format!(
                "invalid JSON module '{}': {}",
                path.display(),
                err
            ))
        })?;
        let value = json_to_value(&json);

        let mut store = self.store_mut();
        store.touch(path);
        store.put_binding(path, "__jsonModule", value.clone());
        store.put_default_export(path, "__jsonModule")?;
        Ok(value)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts parsed JSON into engine values.
fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Object(JsObject::array(items.iter().map(json_to_value).collect()))
        }
        serde_json::Value::Object(map) => {
            let object = JsObject::plain();
            {
                let mut borrowed = object.borrow_mut();
                for (key, value) in map {
                    borrowed.set(key, json_to_value(value));
                }
            }
            Value::Object(object)
        }
    }
}

/// Namespaces are absolute canonical paths; the file does not have to
/// exist (fresh REPL namespaces usually don't).
fn canonical_namespace(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute.canonicalize().unwrap_or(absolute)
}

fn is_typescript_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("ts") | Some("tsx") | Some("mts") | Some("cts")
    )
}
