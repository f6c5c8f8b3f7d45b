//! The Math object.

use std::cell::Cell;

use crate::runtime::{Environment, JsFunction, JsObject, Value};

/// Installs `Math` into the environment.
pub fn install(env: &Environment) {
    let math = JsObject::plain();

    {
        let mut obj = math.borrow_mut();
        obj.set("PI", Value::Number(std::f64::consts::PI));
        obj.set("E", Value::Number(std::f64::consts::E));

        macro_rules! unary {
            ($name:literal, $op:expr) => {
                obj.set(
                    $name,
                    Value::Function(JsFunction::native($name, move |_interp, _this, args| {
                        let n = args.first().map(|v| v.to_number()).unwrap_or(f64::NAN);
                        let op: fn(f64) -> f64 = $op;
                        Ok(Value::Number(op(n)))
                    })),
                );
            };
        }

        unary!("abs", f64::abs);
        unary!("floor", f64::floor);
        unary!("ceil", f64::ceil);
        unary!("round", f64::round);
        unary!("trunc", f64::trunc);
        unary!("sqrt", f64::sqrt);
        unary!("sign", f64::signum);
        unary!("log", f64::ln);
        unary!("exp", f64::exp);

        obj.set(
            "pow",
            Value::Function(JsFunction::native("pow", |_interp, _this, args| {
                let base = args.first().map(|v| v.to_number()).unwrap_or(f64::NAN);
                let exponent = args.get(1).map(|v| v.to_number()).unwrap_or(f64::NAN);
                Ok(Value::Number(base.powf(exponent)))
            })),
        );
        obj.set(
            "min",
            Value::Function(JsFunction::native("min", |_interp, _this, args| {
                let mut result = f64::INFINITY;
                for arg in args {
                    let n = arg.to_number();
                    if n.is_nan() {
                        return Ok(Value::Number(f64::NAN));
                    }
                    result = result.min(n);
                }
                Ok(Value::Number(result))
            })),
        );
        obj.set(
            "max",
            Value::Function(JsFunction::native("max", |_interp, _this, args| {
                let mut result = f64::NEG_INFINITY;
                for arg in args {
                    let n = arg.to_number();
                    if n.is_nan() {
                        return Ok(Value::Number(f64::NAN));
                    }
                    result = result.max(n);
                }
                Ok(Value::Number(result))
            })),
        );
        obj.set(
            "random",
            Value::Function(JsFunction::native("random", |_interp, _this, _args| {
                Ok(Value::Number(next_random()))
            })),
        );
    }

    env.declare("Math", Value::Object(math), false);
}

thread_local! {
    static RANDOM_STATE: Cell<u64> = Cell::new(0);
}

/// A small xorshift generator, seeded lazily from the system clock. Not
/// cryptographic, which matches what `Math.random` promises.
fn next_random() -> f64 {
    RANDOM_STATE.with(|state| {
        let mut x = state.get();
        if x == 0 {
            x = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x9e3779b97f4a7c15)
                | 1;
        }
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        (x >> 11) as f64 / (1u64 << 53) as f64
    })
}
