// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scope synthesizer.
//!
//! Materializes the environment a rewritten fragment runs against. Four
//! layers, innermost first on lookup:
//!
//! 1. CJS stubs and registration helpers (`module`, `exports`, `require`,
//!    `__filename`, `__dirname`, and the `__put*` natives the rewriter
//!    targets)
//! 2. resolved imports for this namespace
//! 3. this namespace's current bindings
//! 4. host globals (console, Math, JSON, ...)
//!
//! Built as an environment chain, so the conflict policy (1 beats 2 beats
//! 3 beats 4) is simply shadowing, and writes to non-stub names never reach
//! the store.

use margin_engine::{builtins, Environment, JsFunction, JsObject, ObjectRef, Value};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::rewrite::{DYNAMIC_IMPORT, PUT_BINDING, PUT_DEFAULT_EXPORT, PUT_EXPORT};
use crate::store::{ExportName, ImportKind, ImportRecord, ImportTarget, NamespaceStore};
use crate::{EvalOptions, Session};

/// The synthesized scope plus the handles the evaluator needs afterwards
/// for the `module.exports` sweep.
pub(crate) struct SynthesizedScope {
    /// The innermost layer; execution happens in a child of this
    pub env: Environment,
    /// The `module` stub object
    pub module: ObjectRef,
    /// The value `module.exports` was seeded with
    pub seeded_exports: Value,
    /// Whether the seed was a fresh empty object (no prior default export)
    pub seed_is_fresh: bool,
}

/// Builds the scope chain for one evaluation of `namespace`.
pub(crate) fn synthesize(
    session: &Session,
    namespace: &Path,
    options: EvalOptions,
) -> Result<SynthesizedScope> {
    // Layer 4: host globals.
    let globals = Environment::new();
    builtins::install(&globals, session.console_sink());

    let snapshot = session.store().snapshot(namespace);

    // Layer 3: this namespace's bindings.
    let bindings = globals.child();
    for (local, value) in &snapshot.bindings {
        bindings.declare(local.clone(), value.clone(), true);
    }

    // Layer 2: resolved imports.
    let imports = bindings.child();
    for record in snapshot.imports.values() {
        let value = import_value(session, namespace, record)?;
        imports.declare(record.local.clone(), value, true);
    }

    // Layer 1: CJS stubs and registration helpers.
    let stubs = imports.child();
    let (module, seeded_exports, seed_is_fresh) = install_cjs_stubs(session, namespace, options, &stubs);
    install_registration_stubs(session, &stubs);
    install_dynamic_import(session, options, &stubs);

    Ok(SynthesizedScope {
        env: stubs,
        module,
        seeded_exports,
        seed_is_fresh,
    })
}

/// Resolves one import record to the value its local name binds to.
fn import_value(session: &Session, namespace: &Path, record: &ImportRecord) -> Result<Value> {
    match &record.target {
        ImportTarget::BuiltIn(id) => {
            // Built-ins come from the host loader on every call.
            let module = session.host().load(id, namespace)?;
            Ok(match &record.kind {
                ImportKind::Default | ImportKind::Namespace => module,
                ImportKind::Named(name) => match &module {
                    Value::Object(obj) => obj.borrow().get_own(name).unwrap_or(Value::Undefined),
                    _ => Value::Undefined,
                },
            })
        }
        ImportTarget::User(path) => {
            let store = session.store();
            Ok(match &record.kind {
                ImportKind::Named(name) => store
                    .resolve_export(path, &ExportName::Named(name.clone()))
                    .unwrap_or(Value::Undefined),
                ImportKind::Default => store
                    .resolve_export(path, &ExportName::Default)
                    .unwrap_or(Value::Undefined),
                ImportKind::Namespace => namespace_object(&store, path),
            })
        }
    }
}

/// Materializes an `import * as X` object: one property per export,
/// snapshotted at scope-synthesis time.
pub(crate) fn namespace_object(store: &NamespaceStore, target: &Path) -> Value {
    let object = JsObject::plain();
    let snapshot = store.snapshot(target);
    {
        let mut borrowed = object.borrow_mut();
        for (exported, local) in &snapshot.exports {
            let key = match exported {
                ExportName::Named(name) => name.clone(),
                ExportName::Default => "default".to_string(),
            };
            let value = snapshot.bindings.get(local).cloned().unwrap_or(Value::Undefined);
            borrowed.set(&key, value);
        }
    }
    Value::Object(object)
}

/// Installs `module`, `exports`, `require`, `__filename`, `__dirname`.
fn install_cjs_stubs(
    session: &Session,
    namespace: &Path,
    options: EvalOptions,
    stubs: &Environment,
) -> (ObjectRef, Value, bool) {
    // `module.exports` is seeded with the current default export so that
    // `exports.k = v` mutates it in place; a fresh object otherwise.
    let (seed, seed_is_fresh) = match session.store().default_export(namespace) {
        Some(value) => (value, false),
        None => (Value::Object(JsObject::plain()), true),
    };

    let module = JsObject::plain();
    module.borrow_mut().set("exports", seed.clone());
    stubs.declare("module", Value::Object(module.clone()), false);
    // `exports` starts aliased to `module.exports`; assigning to
    // `module.exports` un-aliases them, which the post-run sweep detects.
    stubs.declare("exports", seed.clone(), false);

    stubs.declare(
        "__filename",
        Value::String(namespace.display().to_string()),
        false,
    );
    stubs.declare(
        "__dirname",
        Value::String(
            namespace
                .parent()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        ),
        false,
    );

    let require_session = session.clone();
    let importer = namespace.to_path_buf();
    stubs.declare(
        "require",
        Value::Function(JsFunction::native("require", move |_interp, _this, args| {
            let specifier = args.first().map(|v| v.to_js_string()).unwrap_or_default();
            require_session
                .require_value(&importer, &specifier, options)
                .map_err(|err| require_session.defer(err))
        })),
        false,
    );

    (module, seed, seed_is_fresh)
}

/// Installs the `__put*` natives the rewriter's registration calls target.
fn install_registration_stubs(session: &Session, stubs: &Environment) {
    let put_session = session.clone();
    stubs.declare(
        PUT_BINDING,
        Value::Function(JsFunction::native(
            PUT_BINDING,
            move |_interp, _this, args| {
                let namespace = path_arg(args, 0);
                let local = string_arg(args, 1);
                let value = args.get(2).cloned().unwrap_or(Value::Undefined);
                put_session
                    .store_mut()
                    .put_binding(&namespace, &local, value);
                Ok(Value::Undefined)
            },
        )),
        false,
    );

    let put_session = session.clone();
    stubs.declare(
        PUT_EXPORT,
        Value::Function(JsFunction::native(
            PUT_EXPORT,
            move |_interp, _this, args| {
                let namespace = path_arg(args, 0);
                let local = string_arg(args, 1);
                let exported = string_arg(args, 2);
                put_session
                    .store_mut()
                    .put_export(&namespace, &local, &exported)
                    .map_err(|err| put_session.defer(err))?;
                Ok(Value::Undefined)
            },
        )),
        false,
    );

    let put_session = session.clone();
    stubs.declare(
        PUT_DEFAULT_EXPORT,
        Value::Function(JsFunction::native(
            PUT_DEFAULT_EXPORT,
            move |_interp, _this, args| {
                let namespace = path_arg(args, 0);
                let local = string_arg(args, 1);
                put_session
                    .store_mut()
                    .put_default_export(&namespace, &local)
                    .map_err(|err| put_session.defer(err))?;
                Ok(Value::Undefined)
            },
        )),
        false,
    );
}

/// Installs the dynamic-import helper. Returns an already-resolved
/// thenable; evaluation of the target is synchronous.
fn install_dynamic_import(session: &Session, options: EvalOptions, stubs: &Environment) {
    let import_session = session.clone();
    stubs.declare(
        DYNAMIC_IMPORT,
        Value::Function(JsFunction::native(
            DYNAMIC_IMPORT,
            move |_interp, _this, args| {
                let importer = path_arg(args, 0);
                let specifier = string_arg(args, 1);
                import_session
                    .dynamic_import_value(&importer, &specifier, options)
                    .map(resolved_promise)
                    .map_err(|err| import_session.defer(err))
            },
        )),
        false,
    );
}

/// A minimal resolved thenable: `then(cb)` invokes the callback right away
/// and yields another resolved thenable for chaining.
pub(crate) fn resolved_promise(value: Value) -> Value {
    let object = JsObject::plain();

    let resolved = value.clone();
    let then = JsFunction::native("then", move |interp, _this, args| {
        let result = match args.first() {
            Some(Value::Function(callback)) => {
                interp.call_function(callback, Value::Undefined, &[resolved.clone()])?
            }
            _ => resolved.clone(),
        };
        Ok(resolved_promise(result))
    });

    let catch = JsFunction::native("catch", move |_interp, this, _args| Ok(this.clone()));

    {
        let mut borrowed = object.borrow_mut();
        borrowed.set("then", Value::Function(then));
        borrowed.set("catch", Value::Function(catch));
    }
    Value::Object(object)
}

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(|v| v.to_js_string()).unwrap_or_default()
}

fn path_arg(args: &[Value], index: usize) -> PathBuf {
    PathBuf::from(string_arg(args, index))
}
