//! Free global functions and the Object/Array/Error constructors.

use crate::runtime::object::JsObject;
use crate::runtime::{Environment, JsFunction, Value};

/// Installs the remaining globals.
pub fn install(env: &Environment) {
    env.declare("NaN", Value::Number(f64::NAN), false);
    env.declare("Infinity", Value::Number(f64::INFINITY), false);
    env.declare("undefined", Value::Undefined, false);

    env.declare(
        "parseInt",
        Value::Function(JsFunction::native("parseInt", |_interp, _this, args| {
            let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
            let text = text.trim();
            let radix = args.get(1).map(|v| v.to_number() as u32).unwrap_or(10);
            let radix = if radix == 0 { 10 } else { radix };

            let (digits, negative) = match text.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (text.strip_prefix('+').unwrap_or(text), false),
            };
            let digits = if radix == 16 {
                digits
                    .strip_prefix("0x")
                    .or_else(|| digits.strip_prefix("0X"))
                    .unwrap_or(digits)
            } else {
                digits
            };

            let valid: String = digits
                .chars()
                .take_while(|c| c.to_digit(radix).is_some())
                .collect();
            if valid.is_empty() {
                return Ok(Value::Number(f64::NAN));
            }
            let mut n = 0f64;
            for c in valid.chars() {
                n = n * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
            }
            Ok(Value::Number(if negative { -n } else { n }))
        })),
        false,
    );

    env.declare(
        "parseFloat",
        Value::Function(JsFunction::native("parseFloat", |_interp, _this, args| {
            let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
            let text = text.trim();
            let mut end = 0;
            let mut seen_dot = false;
            let mut seen_exp = false;
            for (i, c) in text.char_indices() {
                match c {
                    '0'..='9' => end = i + 1,
                    '-' | '+' if i == 0 => {}
                    '.' if !seen_dot && !seen_exp => seen_dot = true,
                    'e' | 'E' if !seen_exp && end > 0 => seen_exp = true,
                    _ => break,
                }
            }
            Ok(Value::Number(
                text[..end].parse::<f64>().unwrap_or(f64::NAN),
            ))
        })),
        false,
    );

    env.declare(
        "isNaN",
        Value::Function(JsFunction::native("isNaN", |_interp, _this, args| {
            let n = args.first().map(|v| v.to_number()).unwrap_or(f64::NAN);
            Ok(Value::Boolean(n.is_nan()))
        })),
        false,
    );

    env.declare(
        "isFinite",
        Value::Function(JsFunction::native("isFinite", |_interp, _this, args| {
            let n = args.first().map(|v| v.to_number()).unwrap_or(f64::NAN);
            Ok(Value::Boolean(n.is_finite()))
        })),
        false,
    );

    install_conversions(env);
    install_object(env);
    install_array(env);
    install_errors(env);
}

fn install_conversions(env: &Environment) {
    let string = JsFunction::native("String", |_interp, _this, args| {
        Ok(Value::String(
            args.first().map(|v| v.to_js_string()).unwrap_or_default(),
        ))
    });
    env.declare("String", Value::Function(string), false);

    let number = JsFunction::native("Number", |_interp, _this, args| {
        Ok(Value::Number(
            args.first().map(|v| v.to_number()).unwrap_or(0.0),
        ))
    });
    number.set_property("MAX_SAFE_INTEGER", Value::Number(9007199254740991.0));
    number.set_property("EPSILON", Value::Number(f64::EPSILON));
    let is_integer = JsFunction::native("isInteger", |_interp, _this, args| {
        Ok(Value::Boolean(match args.first() {
            Some(Value::Number(n)) => n.fract() == 0.0 && n.is_finite(),
            _ => false,
        }))
    });
    number.set_property("isInteger", Value::Function(is_integer));
    env.declare("Number", Value::Function(number), false);

    let boolean = JsFunction::native("Boolean", |_interp, _this, args| {
        Ok(Value::Boolean(
            args.first().map(|v| v.to_boolean()).unwrap_or(false),
        ))
    });
    env.declare("Boolean", Value::Function(boolean), false);
}

fn install_object(env: &Environment) {
    let object = JsFunction::native("Object", |_interp, _this, args| {
        Ok(match args.first() {
            Some(value @ Value::Object(_)) => value.clone(),
            _ => Value::Object(JsObject::plain()),
        })
    });

    let keys = JsFunction::native("keys", |_interp, _this, args| {
        let keys = match args.first() {
            Some(Value::Object(obj)) => obj
                .borrow()
                .keys()
                .into_iter()
                .map(Value::String)
                .collect(),
            _ => Vec::new(),
        };
        Ok(Value::Object(JsObject::array(keys)))
    });
    object.set_property("keys", Value::Function(keys));

    let values = JsFunction::native("values", |_interp, _this, args| {
        let values = match args.first() {
            Some(Value::Object(obj)) => {
                let borrowed = obj.borrow();
                borrowed
                    .keys()
                    .into_iter()
                    .filter_map(|key| borrowed.get_own(&key))
                    .collect()
            }
            _ => Vec::new(),
        };
        Ok(Value::Object(JsObject::array(values)))
    });
    object.set_property("values", Value::Function(values));

    let entries = JsFunction::native("entries", |_interp, _this, args| {
        let entries = match args.first() {
            Some(Value::Object(obj)) => {
                let borrowed = obj.borrow();
                borrowed
                    .keys()
                    .into_iter()
                    .filter_map(|key| {
                        borrowed.get_own(&key).map(|value| {
                            Value::Object(JsObject::array(vec![Value::String(key), value]))
                        })
                    })
                    .collect()
            }
            _ => Vec::new(),
        };
        Ok(Value::Object(JsObject::array(entries)))
    });
    object.set_property("entries", Value::Function(entries));

    let assign = JsFunction::native("assign", |_interp, _this, args| {
        let target = match args.first() {
            Some(Value::Object(obj)) => obj.clone(),
            _ => JsObject::plain(),
        };
        for source in args.iter().skip(1) {
            if let Value::Object(src) = source {
                let entries: Vec<(String, Value)> = {
                    let borrowed = src.borrow();
                    borrowed
                        .keys()
                        .into_iter()
                        .filter_map(|key| borrowed.get_own(&key).map(|value| (key, value)))
                        .collect()
                };
                let mut borrowed = target.borrow_mut();
                for (key, value) in entries {
                    borrowed.set(&key, value);
                }
            }
        }
        Ok(Value::Object(target))
    });
    object.set_property("assign", Value::Function(assign));

    env.declare("Object", Value::Function(object), false);
}

fn install_array(env: &Environment) {
    let array = JsFunction::native("Array", |_interp, _this, args| {
        Ok(Value::Object(JsObject::array(args.to_vec())))
    });

    let is_array = JsFunction::native("isArray", |_interp, _this, args| {
        Ok(Value::Boolean(matches!(
            args.first(),
            Some(Value::Object(obj)) if obj.borrow().is_array()
        )))
    });
    array.set_property("isArray", Value::Function(is_array));

    env.declare("Array", Value::Function(array), false);
}

fn install_errors(env: &Environment) {
    for name in ["Error", "TypeError", "RangeError", "SyntaxError"] {
        let constructor = JsFunction::native(name, move |_interp, _this, args| {
            let message = args.first().map(|v| v.to_js_string()).unwrap_or_default();
            Ok(Value::Object(JsObject::error(name, &message)))
        });
        env.declare(name, Value::Function(constructor), false);
    }
}
