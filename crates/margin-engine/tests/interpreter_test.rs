//! End-to-end interpreter tests: parse source, run it, check the value.

use margin_engine::{Engine, Value};

fn eval(source: &str) -> Value {
    Engine::new().eval(source).expect("evaluation failed")
}

fn eval_number(source: &str) -> f64 {
    match eval(source) {
        Value::Number(n) => n,
        other => panic!("expected number from {:?}, got {:?}", source, other),
    }
}

fn eval_string(source: &str) -> String {
    match eval(source) {
        Value::String(s) => s,
        other => panic!("expected string from {:?}, got {:?}", source, other),
    }
}

fn eval_bool(source: &str) -> bool {
    match eval(source) {
        Value::Boolean(b) => b,
        other => panic!("expected boolean from {:?}, got {:?}", source, other),
    }
}

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(eval_number("1 + 2 * 3"), 7.0);
    assert_eq!(eval_number("(1 + 2) * 3"), 9.0);
    assert_eq!(eval_number("10 % 3"), 1.0);
    assert_eq!(eval_number("2 ** 10"), 1024.0);
    assert_eq!(eval_number("7 / 2"), 3.5);
}

#[test]
fn string_concatenation_coerces() {
    assert_eq!(eval_string("'a' + 'b'"), "ab");
    assert_eq!(eval_string("'n = ' + 42"), "n = 42");
    assert_eq!(eval_string("1 + '2'"), "12");
}

#[test]
fn comparison_operators() {
    assert!(eval_bool("1 < 2"));
    assert!(eval_bool("'a' < 'b'"));
    assert!(eval_bool("1 == '1'"));
    assert!(!eval_bool("1 === '1'"));
    assert!(eval_bool("null == undefined"));
    assert!(!eval_bool("NaN === NaN"));
}

#[test]
fn logical_short_circuit() {
    assert_eq!(eval_number("0 || 5"), 5.0);
    assert_eq!(eval_number("3 && 4"), 4.0);
    assert_eq!(eval_number("null ?? 7"), 7.0);
    assert_eq!(eval_number("0 ?? 7"), 0.0);
}

#[test]
fn variables_and_reassignment() {
    assert_eq!(eval_number("let x = 1; x = x + 2; x"), 3.0);
    assert_eq!(eval_number("var a = 1, b = 2; a + b"), 3.0);
}

#[test]
fn const_assignment_is_an_error() {
    let result = Engine::new().eval("const c = 1; c = 2;");
    assert!(matches!(result, Err(margin_engine::Error::TypeError(_))));
}

#[test]
fn undefined_variable_is_reference_error() {
    let result = Engine::new().eval("nope + 1");
    assert!(matches!(
        result,
        Err(margin_engine::Error::ReferenceError(_))
    ));
}

#[test]
fn functions_and_closures() {
    assert_eq!(eval_number("function add(a, b) { return a + b; } add(1, 2)"), 3.0);
    assert_eq!(
        eval_number(
            "function counter() { let n = 0; return function() { n = n + 1; return n; }; }
             const tick = counter(); tick(); tick(); tick()"
        ),
        3.0
    );
}

#[test]
fn function_hoisting_within_a_body() {
    assert_eq!(
        eval_number("function outer() { return helper(); } function helper() { return 9; } outer()"),
        9.0
    );
}

#[test]
fn arrow_functions() {
    assert_eq!(eval_number("const double = x => x * 2; double(21)"), 42.0);
    assert_eq!(eval_number("((a, b) => a + b)(2, 3)"), 5.0);
    assert_eq!(eval_number("const f = () => { return 7; }; f()"), 7.0);
}

#[test]
fn control_flow() {
    assert_eq!(
        eval_number("let total = 0; for (let i = 1; i <= 4; i++) { total += i; } total"),
        10.0
    );
    assert_eq!(
        eval_number("let n = 0; while (n < 5) { n++; if (n === 3) break; } n"),
        3.0
    );
    assert_eq!(
        eval_number("let s = 0; for (const x of [1, 2, 3]) { s += x; } s"),
        6.0
    );
    assert_eq!(eval_number("if (false) { 1; } else { 2; }"), 2.0);
}

#[test]
fn objects_and_member_access() {
    assert_eq!(eval_number("const o = { a: 1, b: { c: 2 } }; o.a + o.b.c"), 3.0);
    assert_eq!(eval_number("const o = {}; o.x = 5; o['y'] = 6; o.x + o.y"), 11.0);
    assert_eq!(eval_number("const a = 1; const o = { a }; o.a"), 1.0);
}

#[test]
fn arrays() {
    assert_eq!(eval_number("[1, 2, 3].length"), 3.0);
    assert_eq!(eval_number("const xs = [1, 2]; xs.push(3); xs[2]"), 3.0);
    assert_eq!(eval_string("[1, 2, 3].join('-')"), "1-2-3");
    assert_eq!(eval_number("[1, 2, 3].map(x => x * 2)[2]"), 6.0);
    assert_eq!(eval_number("[1, 2, 3, 4].filter(x => x % 2 === 0).length"), 2.0);
    assert_eq!(eval_number("[1, 2, 3].reduce((acc, x) => acc + x, 0)"), 6.0);
}

#[test]
fn string_methods() {
    assert_eq!(eval_string("'Hello'.toUpperCase()"), "HELLO");
    assert_eq!(eval_string("'a,b,c'.split(',')[1]"), "b");
    assert_eq!(eval_number("'hello'.length"), 5.0);
    assert!(eval_bool("'margin'.includes('gin')"));
    assert_eq!(eval_string("'  x  '.trim()"), "x");
}

#[test]
fn classes_with_methods_and_statics() {
    assert_eq!(
        eval_number(
            "class Counter {
                 constructor(start) { this.n = start; }
                 tick() { this.n++; return this.n; }
                 static origin() { return new Counter(0); }
             }
             const c = Counter.origin();
             c.tick(); c.tick()"
        ),
        2.0
    );
}

#[test]
fn instanceof_checks_the_prototype_chain() {
    assert!(eval_bool(
        "class Point { constructor() {} } new Point() instanceof Point"
    ));
}

#[test]
fn throw_and_catch() {
    assert_eq!(
        eval_string("try { throw new Error('boom'); } catch (e) { e.message }"),
        "boom"
    );
    assert_eq!(
        eval_number("let x = 0; try { x = 1; } finally { x = x + 10; } x"),
        11.0
    );
    // Engine errors are catchable too
    assert_eq!(
        eval_string("try { missing(); } catch (e) { e.name }"),
        "ReferenceError"
    );
}

#[test]
fn typeof_and_ternary() {
    assert_eq!(eval_string("typeof 1"), "number");
    assert_eq!(eval_string("typeof notDefinedAnywhere"), "undefined");
    assert_eq!(eval_number("true ? 1 : 2"), 1.0);
}

#[test]
fn json_round_trip() {
    assert_eq!(
        eval_string("JSON.stringify({ b: [1, 2], a: 'x' })"),
        r#"{"a":"x","b":[1,2]}"#
    );
    assert_eq!(eval_number("JSON.parse('{\"a\": [1, 2, 3]}').a[2]"), 3.0);
}

#[test]
fn math_builtins() {
    assert_eq!(eval_number("Math.max(1, 9, 4)"), 9.0);
    assert_eq!(eval_number("Math.floor(2.9)"), 2.0);
    assert_eq!(eval_number("Math.abs(-5)"), 5.0);
}

#[test]
fn object_builtins() {
    assert_eq!(eval_number("Object.keys({ a: 1, b: 2 }).length"), 2.0);
    assert_eq!(
        eval_number("Object.assign({}, { a: 1 }, { b: 2 }).b"),
        2.0
    );
    assert!(eval_bool("Array.isArray([1])"));
    assert!(!eval_bool("Array.isArray({})"));
}

#[test]
fn global_conversions() {
    assert_eq!(eval_number("parseInt('42px')"), 42.0);
    assert_eq!(eval_number("parseInt('ff', 16)"), 255.0);
    assert_eq!(eval_number("parseFloat('2.5rem')"), 2.5);
    assert_eq!(eval_string("String(12)"), "12");
    assert_eq!(eval_number("Number('3.5')"), 3.5);
}

#[test]
fn typescript_annotations_are_erased() {
    let program = margin_engine::parser::parse_typescript(
        "function add(a: number, b: number): number { return a + b; }\nadd(20, 22)",
    )
    .unwrap();
    let mut interp = margin_engine::Interpreter::new();
    let result = interp.run(&program).unwrap();
    assert!(matches!(result, Value::Number(n) if n == 42.0));
}

#[test]
fn console_capture_sink() {
    use margin_engine::{ConsoleSink, Environment, Interpreter};

    let (sink, buffer) = ConsoleSink::capture();
    let global = Environment::new();
    margin_engine::builtins::install(&global, sink);
    let mut interp = Interpreter::with_scope(global.child());

    let program = margin_engine::parser::parse(
        "console.log('out', 1); console.error('bad');",
    )
    .unwrap();
    interp.run(&program).unwrap();

    assert_eq!(buffer.borrow().stdout, "out 1\n");
    assert_eq!(buffer.borrow().stderr, "bad\n");
}
