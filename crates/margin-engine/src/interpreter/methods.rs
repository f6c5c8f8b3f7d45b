//! Builtin method dispatch for primitives and arrays.
//!
//! Methods are dispatched by name at the call site rather than through
//! prototype objects; user-defined properties on a concrete object always
//! win (checked by the caller).

use crate::runtime::object::JsObject;
use crate::runtime::value::format_number;
use crate::runtime::{ObjectRef, Value};
use crate::Error;

use super::Interpreter;

/// Calls a string method.
pub fn call_string_method(s: &str, method: &str, args: &[Value]) -> Result<Value, Error> {
    let arg_str = |i: usize| args.get(i).map(|v| v.to_js_string()).unwrap_or_default();
    let arg_num = |i: usize| args.get(i).map(|v| v.to_number());

    let value = match method {
        "charAt" => {
            let index = arg_num(0).unwrap_or(0.0) as usize;
            s.chars()
                .nth(index)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or_else(|| Value::String(String::new()))
        }
        "charCodeAt" => {
            let index = arg_num(0).unwrap_or(0.0) as usize;
            s.chars()
                .nth(index)
                .map(|c| Value::Number(c as u32 as f64))
                .unwrap_or(Value::Number(f64::NAN))
        }
        "indexOf" => {
            let search = arg_str(0);
            match s.find(&search) {
                Some(pos) => Value::Number(s[..pos].chars().count() as f64),
                None => Value::Number(-1.0),
            }
        }
        "lastIndexOf" => {
            let search = arg_str(0);
            match s.rfind(&search) {
                Some(pos) => Value::Number(s[..pos].chars().count() as f64),
                None => Value::Number(-1.0),
            }
        }
        "includes" => Value::Boolean(s.contains(&arg_str(0))),
        "startsWith" => Value::Boolean(s.starts_with(&arg_str(0))),
        "endsWith" => Value::Boolean(s.ends_with(&arg_str(0))),
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "trimStart" => Value::String(s.trim_start().to_string()),
        "trimEnd" => Value::String(s.trim_end().to_string()),
        "concat" => {
            let mut result = s.to_string();
            for arg in args {
                result.push_str(&arg.to_js_string());
            }
            Value::String(result)
        }
        "repeat" => {
            let count = arg_num(0).unwrap_or(0.0);
            if count < 0.0 {
                return Err(Error::RangeError("Invalid count value".into()));
            }
            Value::String(s.repeat(count as usize))
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), arg_num(0), arg_num(1));
            Value::String(chars[start..end].iter().collect())
        }
        "substring" => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as f64;
            let a = arg_num(0).unwrap_or(0.0).clamp(0.0, len) as usize;
            let b = arg_num(1).unwrap_or(len).clamp(0.0, len) as usize;
            let (start, end) = if a > b { (b, a) } else { (a, b) };
            Value::String(chars[start..end].iter().collect())
        }
        "split" => {
            let separator = args.first();
            let parts: Vec<Value> = match separator {
                None | Some(Value::Undefined) => vec![Value::String(s.to_string())],
                Some(sep) => {
                    let sep = sep.to_js_string();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(&sep)
                            .map(|part| Value::String(part.to_string()))
                            .collect()
                    }
                }
            };
            Value::Object(JsObject::array(parts))
        }
        "replace" => {
            let search = arg_str(0);
            let replacement = arg_str(1);
            Value::String(s.replacen(&search, &replacement, 1))
        }
        "replaceAll" => {
            let search = arg_str(0);
            let replacement = arg_str(1);
            Value::String(s.replace(&search, &replacement))
        }
        "padStart" => {
            let target = arg_num(0).unwrap_or(0.0) as usize;
            let pad = args
                .get(1)
                .map(|v| v.to_js_string())
                .unwrap_or_else(|| " ".to_string());
            let mut result = String::new();
            let current = s.chars().count();
            if !pad.is_empty() {
                while result.chars().count() + current < target {
                    result.push_str(&pad);
                }
                let needed = target.saturating_sub(current);
                result = result.chars().take(needed).collect();
            }
            result.push_str(s);
            Value::String(result)
        }
        "toString" | "valueOf" => Value::String(s.to_string()),
        _ => {
            return Err(Error::TypeError(format!(
                "string.{} is not a function",
                method
            )))
        }
    };
    Ok(value)
}

/// Calls a number method.
pub fn call_number_method(n: f64, method: &str, args: &[Value]) -> Result<Value, Error> {
    let value = match method {
        "toString" => {
            let radix = args.first().map(|v| v.to_number() as u32).unwrap_or(10);
            if radix == 10 {
                Value::String(format_number(n))
            } else if (2..=36).contains(&radix) {
                Value::String(format_radix(n as i64, radix))
            } else {
                return Err(Error::RangeError(
                    "toString() radix must be between 2 and 36".into(),
                ));
            }
        }
        "toFixed" => {
            let digits = args.first().map(|v| v.to_number() as usize).unwrap_or(0);
            Value::String(format!("{:.prec$}", n, prec = digits))
        }
        "valueOf" => Value::Number(n),
        _ => {
            return Err(Error::TypeError(format!(
                "number.{} is not a function",
                method
            )))
        }
    };
    Ok(value)
}

/// Calls an array method.
pub fn call_array_method(
    interp: &mut Interpreter,
    array: &ObjectRef,
    method: &str,
    args: &[Value],
) -> Result<Value, Error> {
    let value = match method {
        "push" => {
            let mut borrowed = array.borrow_mut();
            for arg in args {
                borrowed.elements.push(arg.clone());
            }
            Value::Number(borrowed.elements.len() as f64)
        }
        "pop" => {
            let mut borrowed = array.borrow_mut();
            borrowed.elements.pop().unwrap_or(Value::Undefined)
        }
        "shift" => {
            let mut borrowed = array.borrow_mut();
            if borrowed.elements.is_empty() {
                Value::Undefined
            } else {
                borrowed.elements.remove(0)
            }
        }
        "unshift" => {
            let mut borrowed = array.borrow_mut();
            for (i, arg) in args.iter().enumerate() {
                borrowed.elements.insert(i, arg.clone());
            }
            Value::Number(borrowed.elements.len() as f64)
        }
        "indexOf" => {
            let target = args.first().cloned().unwrap_or(Value::Undefined);
            let elements = array.borrow().elements.clone();
            elements
                .iter()
                .position(|v| v.strict_equals(&target))
                .map(|i| Value::Number(i as f64))
                .unwrap_or(Value::Number(-1.0))
        }
        "includes" => {
            let target = args.first().cloned().unwrap_or(Value::Undefined);
            let elements = array.borrow().elements.clone();
            Value::Boolean(elements.iter().any(|v| v.strict_equals(&target)))
        }
        "join" => {
            let separator = args
                .first()
                .map(|v| v.to_js_string())
                .unwrap_or_else(|| ",".to_string());
            let elements = array.borrow().elements.clone();
            let parts: Vec<String> = elements
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect();
            Value::String(parts.join(&separator))
        }
        "slice" => {
            let elements = array.borrow().elements.clone();
            let (start, end) = slice_bounds(
                elements.len(),
                args.first().map(|v| v.to_number()),
                args.get(1).map(|v| v.to_number()),
            );
            Value::Object(JsObject::array(elements[start..end].to_vec()))
        }
        "concat" => {
            let mut elements = array.borrow().elements.clone();
            for arg in args {
                match arg {
                    Value::Object(other) if other.borrow().is_array() => {
                        elements.extend(other.borrow().elements.clone());
                    }
                    other => elements.push(other.clone()),
                }
            }
            Value::Object(JsObject::array(elements))
        }
        "reverse" => {
            array.borrow_mut().elements.reverse();
            Value::Object(array.clone())
        }
        "map" => {
            let callback = callback_arg(args)?;
            let elements = array.borrow().elements.clone();
            let mut mapped = Vec::with_capacity(elements.len());
            for (i, element) in elements.into_iter().enumerate() {
                mapped.push(interp.call_function(
                    &callback,
                    Value::Undefined,
                    &[element, Value::Number(i as f64)],
                )?);
            }
            Value::Object(JsObject::array(mapped))
        }
        "filter" => {
            let callback = callback_arg(args)?;
            let elements = array.borrow().elements.clone();
            let mut kept = Vec::new();
            for (i, element) in elements.into_iter().enumerate() {
                let keep = interp.call_function(
                    &callback,
                    Value::Undefined,
                    &[element.clone(), Value::Number(i as f64)],
                )?;
                if keep.to_boolean() {
                    kept.push(element);
                }
            }
            Value::Object(JsObject::array(kept))
        }
        "forEach" => {
            let callback = callback_arg(args)?;
            let elements = array.borrow().elements.clone();
            for (i, element) in elements.into_iter().enumerate() {
                interp.call_function(
                    &callback,
                    Value::Undefined,
                    &[element, Value::Number(i as f64)],
                )?;
            }
            Value::Undefined
        }
        "find" => {
            let callback = callback_arg(args)?;
            let elements = array.borrow().elements.clone();
            let mut found = Value::Undefined;
            for (i, element) in elements.into_iter().enumerate() {
                let matched = interp.call_function(
                    &callback,
                    Value::Undefined,
                    &[element.clone(), Value::Number(i as f64)],
                )?;
                if matched.to_boolean() {
                    found = element;
                    break;
                }
            }
            found
        }
        "some" => {
            let callback = callback_arg(args)?;
            let elements = array.borrow().elements.clone();
            let mut result = false;
            for (i, element) in elements.into_iter().enumerate() {
                if interp
                    .call_function(&callback, Value::Undefined, &[element, Value::Number(i as f64)])?
                    .to_boolean()
                {
                    result = true;
                    break;
                }
            }
            Value::Boolean(result)
        }
        "every" => {
            let callback = callback_arg(args)?;
            let elements = array.borrow().elements.clone();
            let mut result = true;
            for (i, element) in elements.into_iter().enumerate() {
                if !interp
                    .call_function(&callback, Value::Undefined, &[element, Value::Number(i as f64)])?
                    .to_boolean()
                {
                    result = false;
                    break;
                }
            }
            Value::Boolean(result)
        }
        "reduce" => {
            let callback = callback_arg(args)?;
            let elements = array.borrow().elements.clone();
            let mut iter = elements.into_iter().enumerate();
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match iter.next() {
                    Some((_, first)) => first,
                    None => {
                        return Err(Error::TypeError(
                            "Reduce of empty array with no initial value".into(),
                        ))
                    }
                },
            };
            for (i, element) in iter {
                acc = interp.call_function(
                    &callback,
                    Value::Undefined,
                    &[acc, element, Value::Number(i as f64)],
                )?;
            }
            acc
        }
        "toString" => {
            let elements = array.borrow().elements.clone();
            let parts: Vec<String> = elements
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect();
            Value::String(parts.join(","))
        }
        _ => {
            return Err(Error::TypeError(format!(
                "array.{} is not a function",
                method
            )))
        }
    };
    Ok(value)
}

fn callback_arg(args: &[Value]) -> Result<crate::runtime::FunctionRef, Error> {
    match args.first() {
        Some(Value::Function(func)) => Ok(func.clone()),
        other => Err(Error::TypeError(format!(
            "{} is not a function",
            other.map(|v| v.to_js_string()).unwrap_or_default()
        ))),
    }
}

/// Formats an integer in a given radix.
fn format_radix(mut n: i64, radix: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let negative = n < 0;
    if negative {
        n = -n;
    }
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut result = Vec::new();
    while n > 0 {
        result.push(DIGITS[(n % radix as i64) as usize]);
        n /= radix as i64;
    }
    if negative {
        result.push(b'-');
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// Resolves JavaScript slice bounds (negative indices count from the end).
fn slice_bounds(len: usize, start: Option<f64>, end: Option<f64>) -> (usize, usize) {
    let len = len as f64;
    let resolve = |index: f64| -> usize {
        if index < 0.0 {
            (len + index).max(0.0) as usize
        } else {
            index.min(len) as usize
        }
    };
    let start = resolve(start.unwrap_or(0.0));
    let end = resolve(end.unwrap_or(len));
    (start, end.max(start))
}
