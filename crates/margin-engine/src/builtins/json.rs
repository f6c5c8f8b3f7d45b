//! The JSON object.

use std::rc::Rc;

use crate::runtime::object::JsObject;
use crate::runtime::value::format_number;
use crate::runtime::{Environment, JsFunction, Value};
use crate::Error;

/// Installs `JSON` into the environment.
pub fn install(env: &Environment) {
    let json = JsObject::plain();

    {
        let mut obj = json.borrow_mut();
        obj.set(
            "stringify",
            Value::Function(JsFunction::native("stringify", |_interp, _this, args| {
                let value = args.first().cloned().unwrap_or(Value::Undefined);
                let indent = match args.get(2) {
                    Some(Value::Number(n)) if *n >= 1.0 => " ".repeat((*n as usize).min(10)),
                    Some(Value::String(s)) => s.clone(),
                    _ => String::new(),
                };
                let mut seen = Vec::new();
                match stringify(&value, &indent, 0, &mut seen)? {
                    Some(text) => Ok(Value::String(text)),
                    None => Ok(Value::Undefined),
                }
            })),
        );
        obj.set(
            "parse",
            Value::Function(JsFunction::native("parse", |_interp, _this, args| {
                let text = args.first().map(|v| v.to_js_string()).unwrap_or_default();
                let mut parser = JsonParser::new(&text);
                let value = parser.parse_value()?;
                parser.skip_whitespace();
                if !parser.is_at_end() {
                    return Err(Error::SyntaxError(
                        "Unexpected non-whitespace character after JSON".into(),
                    ));
                }
                Ok(value)
            })),
        );
    }

    env.declare("JSON", Value::Object(json), false);
}

/// Serializes a value. `None` means the value is not representable
/// (undefined or a function), which callers map per position.
fn stringify(
    value: &Value,
    indent: &str,
    depth: usize,
    seen: &mut Vec<*const ()>,
) -> Result<Option<String>, Error> {
    Ok(Some(match value {
        Value::Undefined | Value::Function(_) => return Ok(None),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_finite() {
                format_number(*n)
            } else {
                "null".to_string()
            }
        }
        Value::String(s) => quote(s),
        Value::Object(obj) => {
            let ptr = Rc::as_ptr(obj) as *const ();
            if seen.contains(&ptr) {
                return Err(Error::TypeError(
                    "Converting circular structure to JSON".into(),
                ));
            }
            seen.push(ptr);

            let borrowed = obj.borrow();
            let (open, close, items): (char, char, Vec<String>) = if borrowed.is_array() {
                let mut items = Vec::with_capacity(borrowed.elements.len());
                for element in &borrowed.elements {
                    items.push(
                        stringify(element, indent, depth + 1, seen)?
                            .unwrap_or_else(|| "null".to_string()),
                    );
                }
                ('[', ']', items)
            } else {
                let mut items = Vec::new();
                let mut keys: Vec<&String> = borrowed.properties.keys().collect();
                keys.sort();
                for key in keys {
                    let member = &borrowed.properties[key];
                    if let Some(rendered) = stringify(member, indent, depth + 1, seen)? {
                        let separator = if indent.is_empty() { ":" } else { ": " };
                        items.push(format!("{}{}{}", quote(key), separator, rendered));
                    }
                }
                ('{', '}', items)
            };
            drop(borrowed);
            seen.pop();

            if items.is_empty() {
                format!("{}{}", open, close)
            } else if indent.is_empty() {
                format!("{}{}{}", open, items.join(","), close)
            } else {
                let inner_pad = indent.repeat(depth + 1);
                let outer_pad = indent.repeat(depth);
                format!(
                    "{}\n{}{}\n{}{}",
                    open,
                    inner_pad,
                    items.join(&format!(",\n{}", inner_pad)),
                    outer_pad,
                    close
                )
            }
        }
    }))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A minimal JSON parser producing engine values.
struct JsonParser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> JsonParser<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn parse_value(&mut self) -> Result<Value, Error> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') => Ok(Value::String(self.parse_string()?)),
            Some('t') => self.parse_word("true", Value::Boolean(true)),
            Some('f') => self.parse_word("false", Value::Boolean(false)),
            Some('n') => self.parse_word("null", Value::Null),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            other => Err(Error::SyntaxError(format!(
                "Unexpected character in JSON: {:?}",
                other
            ))),
        }
    }

    fn parse_object(&mut self) -> Result<Value, Error> {
        self.advance(); // '{'
        let result = JsObject::plain();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.advance();
            return Ok(Value::Object(result));
        }
        loop {
            self.skip_whitespace();
            let key = self.parse_string()?;
            self.skip_whitespace();
            if self.advance() != Some(':') {
                return Err(Error::SyntaxError("Expected ':' in JSON object".into()));
            }
            let value = self.parse_value()?;
            result.borrow_mut().set(&key, value);
            self.skip_whitespace();
            match self.advance() {
                Some(',') => continue,
                Some('}') => break,
                other => {
                    return Err(Error::SyntaxError(format!(
                        "Expected ',' or '}}' in JSON object, found {:?}",
                        other
                    )))
                }
            }
        }
        Ok(Value::Object(result))
    }

    fn parse_array(&mut self) -> Result<Value, Error> {
        self.advance(); // '['
        let mut elements = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.advance();
            return Ok(Value::Object(JsObject::array(elements)));
        }
        loop {
            elements.push(self.parse_value()?);
            self.skip_whitespace();
            match self.advance() {
                Some(',') => continue,
                Some(']') => break,
                other => {
                    return Err(Error::SyntaxError(format!(
                        "Expected ',' or ']' in JSON array, found {:?}",
                        other
                    )))
                }
            }
        }
        Ok(Value::Object(JsObject::array(elements)))
    }

    fn parse_string(&mut self) -> Result<String, Error> {
        if self.advance() != Some('"') {
            return Err(Error::SyntaxError("Expected string in JSON".into()));
        }
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(Error::SyntaxError("Unterminated JSON string".into())),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000c}'),
                    Some('u') => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            let digit = self
                                .advance()
                                .and_then(|c| c.to_digit(16))
                                .ok_or_else(|| {
                                    Error::SyntaxError("Invalid unicode escape in JSON".into())
                                })?;
                            code = code * 16 + digit;
                        }
                        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    other => {
                        return Err(Error::SyntaxError(format!(
                            "Invalid escape in JSON string: {:?}",
                            other
                        )))
                    }
                },
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn parse_number(&mut self) -> Result<Value, Error> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-')
        {
            self.advance();
        }
        self.source[start..self.pos]
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| Error::SyntaxError("Invalid number in JSON".into()))
    }

    fn parse_word(&mut self, word: &str, value: Value) -> Result<Value, Error> {
        if self.source[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(value)
        } else {
            Err(Error::SyntaxError("Invalid literal in JSON".into()))
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.source[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}
