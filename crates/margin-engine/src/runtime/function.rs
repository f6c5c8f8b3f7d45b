//! JavaScript function representation.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::Statement;
use crate::interpreter::Interpreter;
use crate::Error;

use super::environment::Environment;
use super::value::Value;

/// A shared function reference.
pub type FunctionRef = Rc<JsFunction>;

/// A native (Rust) function. Receives the interpreter, the `this` value,
/// and the argument list.
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Error>>;

/// A callable value - either an interpreted function or a native one.
pub struct JsFunction {
    /// The function name (if any)
    pub name: RefCell<Option<String>>,
    /// How this function is implemented
    pub kind: FunctionKind,
    /// Properties attached to the function value (`prototype`, statics)
    pub properties: RefCell<FxHashMap<String, Value>>,
}

/// The implementation of a function.
pub enum FunctionKind {
    /// An interpreted JavaScript function
    Declared(DeclaredFunction),
    /// A native Rust function
    Native(NativeFn),
}

/// An interpreted function: parameters, body, and captured scope.
pub struct DeclaredFunction {
    /// The parameter names
    pub params: Vec<String>,
    /// The function body
    pub body: Rc<FunctionBody>,
    /// The closed-over environment
    pub closure: Environment,
    /// Whether this is an arrow function (lexical `this`)
    pub is_arrow: bool,
    /// `this` captured at creation, for arrows
    pub captured_this: Option<Box<Value>>,
}

/// The body of an interpreted function.
pub enum FunctionBody {
    /// Block body
    Block(Vec<Statement>),
    /// Expression body (arrow shorthand)
    Expression(crate::ast::Expression),
}

impl JsFunction {
    /// Creates an interpreted function value.
    pub fn declared(
        name: Option<String>,
        params: Vec<String>,
        body: FunctionBody,
        closure: Environment,
    ) -> FunctionRef {
        Rc::new(Self {
            name: RefCell::new(name),
            kind: FunctionKind::Declared(DeclaredFunction {
                params,
                body: Rc::new(body),
                closure,
                is_arrow: false,
                captured_this: None,
            }),
            properties: RefCell::new(FxHashMap::default()),
        })
    }

    /// Creates an arrow function value with its captured `this`.
    pub fn arrow(
        params: Vec<String>,
        body: FunctionBody,
        closure: Environment,
        captured_this: Value,
    ) -> FunctionRef {
        Rc::new(Self {
            name: RefCell::new(None),
            kind: FunctionKind::Declared(DeclaredFunction {
                params,
                body: Rc::new(body),
                closure,
                is_arrow: true,
                captured_this: Some(Box::new(captured_this)),
            }),
            properties: RefCell::new(FxHashMap::default()),
        })
    }

    /// Creates a native function value.
    pub fn native(
        name: &str,
        func: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Error> + 'static,
    ) -> FunctionRef {
        Rc::new(Self {
            name: RefCell::new(Some(name.to_string())),
            kind: FunctionKind::Native(Rc::new(func)),
            properties: RefCell::new(FxHashMap::default()),
        })
    }

    /// Reads a property attached to the function value.
    pub fn get_property(&self, key: &str) -> Option<Value> {
        self.properties.borrow().get(key).cloned()
    }

    /// Attaches a property to the function value.
    pub fn set_property(&self, key: &str, value: Value) {
        self.properties.borrow_mut().insert(key.to_string(), value);
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FunctionKind::Declared(_) => {
                write!(f, "Function({:?})", self.name.borrow())
            }
            FunctionKind::Native(_) => {
                write!(f, "NativeFunction({:?})", self.name.borrow())
            }
        }
    }
}
