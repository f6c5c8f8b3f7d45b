//! End-to-end session tests: the testable properties of the evaluation
//! engine, plus the concrete editor scenarios they back.

use margin_engine::Value;
use margin_session::{EvalError, EvalOptions, Session};
use std::fs;
use std::path::{Path, PathBuf};

fn eval(session: &Session, ns: &Path, code: &str) -> Value {
    session
        .evaluate(ns, code, EvalOptions::default())
        .expect("evaluation failed")
}

fn eval_with_imports(session: &Session, ns: &Path, code: &str) -> Value {
    session
        .evaluate(ns, code, EvalOptions::with_imports())
        .expect("evaluation failed")
}

fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        other => panic!("expected number, got {:?}", other),
    }
}

fn ns(name: &str) -> PathBuf {
    std::env::temp_dir().join(name)
}

// --- Fragment evaluation in a single namespace ---

#[test]
fn trailing_expression_yields_the_value() {
    // P3
    let session = Session::new();
    let ns = ns("margin-p3.js");
    assert_eq!(number(&eval(&session, &ns, "1 + 2")), 3.0);
    assert!(eval(&session, &ns, "const a = 5;").is_undefined());
}

#[test]
fn fresh_namespace_stays_empty_without_bindings() {
    // Scenario 1
    let session = Session::new();
    let ns = ns("margin-scenario1.js");
    assert_eq!(number(&eval(&session, &ns, "1 + 1")), 2.0);
    assert!(session.binding(&ns, "x").is_none());
}

#[test]
fn bindings_persist_across_evaluations() {
    // Scenario 2 + 3
    let session = Session::new();
    let ns = ns("margin-scenario2.js");

    assert_eq!(number(&eval(&session, &ns, "const x = 10; x * 2")), 20.0);
    assert!(matches!(
        session.binding(&ns, "x"),
        Some(Value::Number(n)) if n == 10.0
    ));

    eval(&session, &ns, "function f(n) { return n + 1 }");
    assert_eq!(number(&eval(&session, &ns, "f(41)")), 42.0);
}

#[test]
fn re_registration_is_idempotent() {
    // P1
    let session = Session::new();
    let ns = ns("margin-p1.js");
    eval(&session, &ns, "const x = 1");
    eval(&session, &ns, "const x = 1");
    assert!(matches!(
        session.binding(&ns, "x"),
        Some(Value::Number(n)) if n == 1.0
    ));
}

#[test]
fn redefinition_overwrites() {
    // P2
    let session = Session::new();
    let ns = ns("margin-p2.js");
    eval(&session, &ns, "const x = 1");
    eval(&session, &ns, "const x = 2");
    assert_eq!(number(&eval(&session, &ns, "x")), 2.0);
}

#[test]
fn multi_declarator_statements_register_every_name() {
    let session = Session::new();
    let ns = ns("margin-multidecl.js");
    eval(&session, &ns, "let a = 1, b = 2, c = a + b;");
    assert_eq!(number(&eval(&session, &ns, "c")), 3.0);
    assert!(session.binding(&ns, "b").is_some());
}

#[test]
fn runtime_errors_yield_undefined_and_keep_the_session() {
    let session = Session::new();
    let ns = ns("margin-runtime-error.js");
    eval(&session, &ns, "const x = 7;");
    assert!(eval(&session, &ns, "throw new Error('typo')").is_undefined());
    assert!(eval(&session, &ns, "missing.method()").is_undefined());
    assert_eq!(number(&eval(&session, &ns, "x")), 7.0);
}

#[test]
fn parse_errors_are_fatal_to_the_call() {
    let session = Session::new();
    let ns = ns("margin-parse-error.js");
    let err = session
        .evaluate(&ns, "let = ;", EvalOptions::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::Parse(_)));
}

#[test]
fn reexport_syntax_is_unsupported() {
    let session = Session::new();
    let ns = ns("margin-reexport.js");
    let err = session
        .evaluate(&ns, "export * from './other';", EvalOptions::default())
        .unwrap_err();
    assert!(matches!(err, EvalError::Unsupported(_)));
}

#[test]
fn typescript_fragments_are_type_erased() {
    let session = Session::new();
    let ns = ns("margin-ts-test.ts");
    assert_eq!(
        number(&eval(
            &session,
            &ns,
            "const n: number = 21;\nfunction twice(x: number): number { return x * 2 }\ntwice(n)"
        )),
        42.0
    );
}

// --- Exports ---

#[test]
fn missing_local_fails_export_registration() {
    // P10
    let session = Session::new();
    let ns = ns("margin-p10.js");
    let err = session
        .evaluate(&ns, "export { ghost };", EvalOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EvalError::MissingLocal { local, .. } if local == "ghost"
    ));
}

#[test]
fn exporting_previously_evaluated_bindings_works() {
    let session = Session::new();
    let ns = ns("margin-late-export.js");
    eval(&session, &ns, "const answer = 42;");
    eval(&session, &ns, "export { answer };");
    assert!(session.default_export(&ns).is_none());

    eval(&session, &ns, "export default answer;");
    assert!(matches!(
        session.default_export(&ns),
        Some(Value::Number(n)) if n == 42.0
    ));
}

#[test]
fn default_export_expressions_are_bound_and_registered() {
    // Scenario 6, with the restriction on non-identifier default exports
    // lifted: arbitrary expressions bind to a synthesized identifier.
    let session = Session::new();
    let ns = ns("margin-default-expr.js");
    eval(&session, &ns, "export default 5");
    assert!(matches!(
        session.default_export(&ns),
        Some(Value::Number(n)) if n == 5.0
    ));

    eval(&session, &ns, "export default { a: 1 }");
    assert!(matches!(session.default_export(&ns), Some(Value::Object(_))));
}

// --- Imports across files ---

#[test]
fn import_round_trip() {
    // P4 / Scenario 4
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("lib.js"),
        "export const greet = (n) => 'hi ' + n;",
    )
    .unwrap();
    let app = dir.path().join("app.js");

    let session = Session::new();
    let result = eval_with_imports(
        &session,
        &app,
        "import { greet } from './lib';\ngreet('x')",
    );
    assert_eq!(result.to_js_string(), "hi x");
}

#[test]
fn imports_left_unevaluated_resolve_to_undefined() {
    // Invariant 2: missing exports surface as undefined, not errors.
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.js"), "export const v = 42;").unwrap();
    let app = dir.path().join("app.js");

    let session = Session::new();
    let result = eval(
        &session,
        &app,
        "import { v } from './lib';\ntypeof v",
    );
    assert_eq!(result.to_js_string(), "undefined");
}

#[test]
fn default_exports_travel_between_files() {
    // P5
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("seven.js"),
        "export default function seven() { return 7 }",
    )
    .unwrap();
    let app = dir.path().join("app.js");

    let session = Session::new();
    let result = eval_with_imports(
        &session,
        &app,
        "import seven from './seven';\nseven()",
    );
    assert_eq!(number(&result), 7.0);

    // The same module through require() yields the same callable.
    let result = eval_with_imports(&session, &app, "require('./seven')()");
    assert_eq!(number(&result), 7.0);
}

#[test]
fn namespace_imports_snapshot_current_bindings() {
    // P9
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib.js");
    fs::write(&lib, "export const x = 1;\nexport const y = 2;").unwrap();
    let app = dir.path().join("app.js");

    let session = Session::new();
    let code = "import * as lib from './lib';\nlib.x + lib.y";
    assert_eq!(number(&eval_with_imports(&session, &app, code)), 3.0);

    // Redefine x in the library's namespace; a re-run sees the new value.
    eval(&session, &lib, "export const x = 10;");
    assert_eq!(number(&eval_with_imports(&session, &app, code)), 12.0);
}

#[test]
fn namespace_import_exposes_default_under_default_key() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("lib.js"),
        "export const a = 1;\nexport default 9;",
    )
    .unwrap();
    let app = dir.path().join("app.js");

    let session = Session::new();
    let result = eval_with_imports(
        &session,
        &app,
        "import * as lib from './lib';\nlib.default + lib.a",
    );
    assert_eq!(number(&result), 10.0);
}

#[test]
fn cyclic_imports_terminate() {
    // P6
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.js");
    let b = dir.path().join("b.js");
    fs::write(&a, "import { b } from './b';\nexport const a = 1;").unwrap();
    fs::write(&b, "import { a } from './a';\nexport const b = 2;").unwrap();

    let session = Session::new();
    let source = fs::read_to_string(&a).unwrap();
    session
        .evaluate(&a, &source, EvalOptions::with_imports())
        .unwrap();

    assert!(session.binding(&a, "a").is_some());
    assert!(session.binding(&b, "b").is_some());
}

#[test]
fn builtins_never_enter_the_store() {
    // P7
    let session = Session::new();
    let ns = ns("margin-p7.js");
    let result = eval(
        &session,
        &ns,
        "import fs from 'fs';\ntypeof fs.readFileSync",
    );
    assert_eq!(result.to_js_string(), "function");
    assert!(session.binding(Path::new("fs"), "fs").is_none());
}

#[test]
fn named_builtin_imports_pick_one_member() {
    let session = Session::new();
    let ns = ns("margin-builtin-named.js");
    let result = eval(
        &session,
        &ns,
        "import { join } from 'path';\njoin('a', 'b')",
    );
    assert_eq!(result.to_js_string(), "a/b");
}

#[test]
fn unresolvable_relative_import_is_a_resolve_error() {
    let session = Session::new();
    let ns = ns("margin-resolve-error.js");
    let err = session
        .evaluate(
            &ns,
            "import { x } from './definitely-not-here';",
            EvalOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, EvalError::Resolve { .. }));
}

#[test]
fn dynamic_import_resolves_namespace_objects() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.js"), "export const value = 33;").unwrap();
    let app = dir.path().join("app.js");

    let session = Session::new();
    let result = eval_with_imports(
        &session,
        &app,
        "let got;\nimport('./lib').then(m => { got = m.value; });\ngot",
    );
    assert_eq!(number(&result), 33.0);
}

// --- CommonJS interop ---

#[test]
fn module_exports_round_trips_through_require() {
    // P8 / Scenario 5
    let dir = tempfile::tempdir().unwrap();
    let c = dir.path().join("c.js");
    fs::write(&c, "module.exports = 99;").unwrap();
    let d = dir.path().join("d.js");

    let session = Session::new();
    let source = fs::read_to_string(&c).unwrap();
    assert_eq!(
        number(&session.evaluate(&c, &source, EvalOptions::default()).unwrap()),
        99.0
    );
    assert_eq!(
        number(&eval_with_imports(&session, &d, "require('./c')")),
        99.0
    );
}

#[test]
fn module_exports_object_shape_survives() {
    let dir = tempfile::tempdir().unwrap();
    let c = dir.path().join("obj.js");
    fs::write(&c, "module.exports = { a: 1 };").unwrap();
    let d = dir.path().join("d.js");

    let session = Session::new();
    let result = eval_with_imports(&session, &d, "require('./obj').a");
    assert_eq!(number(&result), 1.0);
}

#[test]
fn exports_properties_create_the_default_lazily() {
    let session = Session::new();
    let ns = ns("margin-exports-prop.js");
    eval(&session, &ns, "exports.a = 1; exports.b = 2;");
    match session.default_export(&ns) {
        Some(Value::Object(obj)) => {
            assert!(matches!(
                obj.borrow().get_own("a"),
                Some(Value::Number(n)) if n == 1.0
            ));
        }
        other => panic!("expected default-export object, got {:?}", other),
    }
}

#[test]
fn reassigning_module_exports_overwrites_the_default() {
    let session = Session::new();
    let ns = ns("margin-exports-overwrite.js");
    eval(&session, &ns, "module.exports = 1;");
    eval(&session, &ns, "module.exports = 2;");
    assert!(matches!(
        session.default_export(&ns),
        Some(Value::Number(n)) if n == 2.0
    ));
}

#[test]
fn filename_and_dirname_are_wired() {
    let session = Session::new();
    let ns = ns("margin-filename.js");
    let result = eval(&session, &ns, "__filename");
    assert_eq!(result.to_js_string(), ns.display().to_string());
    let result = eval(&session, &ns, "__dirname");
    assert_eq!(
        result.to_js_string(),
        ns.parent().unwrap().display().to_string()
    );
}

#[test]
fn require_of_json_modules_loads_data() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.json"), r#"{ "port": 8080 }"#).unwrap();
    let app = dir.path().join("app.js");

    let session = Session::new();
    let result = eval_with_imports(&session, &app, "require('./config').port");
    assert_eq!(number(&result), 8080.0);
}

// --- Session plumbing ---

#[test]
fn console_output_is_captured_per_call() {
    let session = Session::new();
    let ns = ns("margin-console.js");
    eval(&session, &ns, "console.log('first');");
    let (stdout, stderr) = session.drain_console();
    assert_eq!(stdout, "first\n");
    assert_eq!(stderr, "");

    eval(&session, &ns, "console.error('second');");
    let (stdout, stderr) = session.drain_console();
    assert_eq!(stdout, "");
    assert_eq!(stderr, "second\n");
}

#[test]
fn reset_forgets_all_namespaces() {
    let session = Session::new();
    let ns = ns("margin-reset.js");
    eval(&session, &ns, "const x = 1;");
    session.reset();
    assert!(session.binding(&ns, "x").is_none());
    assert!(eval(&session, &ns, "typeof x").to_js_string() == "undefined");
}
