//! Object representation.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

use super::value::Value;

/// A shared, mutable object reference.
pub type ObjectRef = Rc<RefCell<JsObject>>;

/// What kind of object this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// A plain object
    Plain,
    /// An array (indexed storage lives in `elements`)
    Array,
    /// An error object (name/message live in properties)
    Error,
}

/// A JavaScript object.
#[derive(Debug)]
pub struct JsObject {
    /// The object kind
    pub kind: ObjectKind,
    /// Named properties
    pub properties: FxHashMap<String, Value>,
    /// Indexed elements, used when `kind` is `Array`
    pub elements: Vec<Value>,
    /// Prototype link for method lookup
    pub prototype: Option<ObjectRef>,
}

impl JsObject {
    /// Creates a plain object.
    pub fn plain() -> ObjectRef {
        Rc::new(RefCell::new(Self {
            kind: ObjectKind::Plain,
            properties: FxHashMap::default(),
            elements: Vec::new(),
            prototype: None,
        }))
    }

    /// Creates an array object.
    pub fn array(elements: Vec<Value>) -> ObjectRef {
        Rc::new(RefCell::new(Self {
            kind: ObjectKind::Array,
            properties: FxHashMap::default(),
            elements,
            prototype: None,
        }))
    }

    /// Creates an error object with `name` and `message` properties.
    pub fn error(name: &str, message: &str) -> ObjectRef {
        let mut properties = FxHashMap::default();
        properties.insert("name".to_string(), Value::String(name.to_string()));
        properties.insert("message".to_string(), Value::String(message.to_string()));
        Rc::new(RefCell::new(Self {
            kind: ObjectKind::Error,
            properties,
            elements: Vec::new(),
            prototype: None,
        }))
    }

    /// Whether this object is an array.
    pub fn is_array(&self) -> bool {
        self.kind == ObjectKind::Array
    }

    /// Reads an own property (array indices and `length` included).
    pub fn get_own(&self, key: &str) -> Option<Value> {
        if self.is_array() {
            if key == "length" {
                return Some(Value::Number(self.elements.len() as f64));
            }
            if let Ok(index) = key.parse::<usize>() {
                return Some(self.elements.get(index).cloned().unwrap_or(Value::Undefined));
            }
        }
        self.properties.get(key).cloned()
    }

    /// Writes a property (array indices and `length` included).
    pub fn set(&mut self, key: &str, value: Value) {
        if self.is_array() {
            if key == "length" {
                let len = value.to_number().max(0.0) as usize;
                self.elements.resize(len, Value::Undefined);
                return;
            }
            if let Ok(index) = key.parse::<usize>() {
                if index >= self.elements.len() {
                    self.elements.resize(index + 1, Value::Undefined);
                }
                self.elements[index] = value;
                return;
            }
        }
        self.properties.insert(key.to_string(), value);
    }

    /// Whether the object (or its prototype chain) has the given key.
    pub fn has(&self, key: &str) -> bool {
        if self.get_own(key).is_some() {
            return true;
        }
        match &self.prototype {
            Some(proto) => proto.borrow().has(key),
            None => false,
        }
    }

    /// Enumerable own keys, array indices first.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = (0..self.elements.len()).map(|i| i.to_string()).collect();
        keys.extend(self.properties.keys().cloned());
        keys
    }
}

/// Reads a property through the prototype chain.
pub fn get_property(object: &ObjectRef, key: &str) -> Option<Value> {
    let mut current = Rc::clone(object);
    loop {
        let next = {
            let borrowed = current.borrow();
            if let Some(value) = borrowed.get_own(key) {
                return Some(value);
            }
            borrowed.prototype.clone()
        };
        match next {
            Some(proto) => current = proto,
            None => return None,
        }
    }
}

/// Writes an own property.
pub fn set_property(object: &ObjectRef, key: &str, value: Value) {
    object.borrow_mut().set(key, value);
}
