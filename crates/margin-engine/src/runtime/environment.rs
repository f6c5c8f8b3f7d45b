//! Lexical environments for variable binding.
//!
//! Environments form a shared chain: closures keep their defining scope
//! alive, and assignments through any handle are visible to every other
//! handle on the same scope.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

use super::value::Value;

/// A lexical environment for variable bindings.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    inner: Rc<RefCell<Scope>>,
}

#[derive(Debug, Default)]
struct Scope {
    bindings: FxHashMap<String, Binding>,
    outer: Option<Environment>,
}

/// A variable binding.
#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

/// The outcome of assigning through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The binding was found and updated
    Assigned,
    /// The binding was found but is `const`
    Immutable,
    /// No binding with that name exists anywhere in the chain
    NotFound,
}

impl Environment {
    /// Creates a new root environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a child environment whose outer scope is this one.
    pub fn child(&self) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Scope {
                bindings: FxHashMap::default(),
                outer: Some(self.clone()),
            })),
        }
    }

    /// Declares a variable in this scope, shadowing any outer binding.
    /// Redeclaration in the same scope overwrites.
    pub fn declare(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.inner
            .borrow_mut()
            .bindings
            .insert(name.into(), Binding { value, mutable });
    }

    /// Whether a binding exists in this scope only.
    pub fn has_own(&self, name: &str) -> bool {
        self.inner.borrow().bindings.contains_key(name)
    }

    /// Gets a variable's value, walking the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        let scope = self.inner.borrow();
        if let Some(binding) = scope.bindings.get(name) {
            return Some(binding.value.clone());
        }
        scope.outer.as_ref().and_then(|outer| outer.get(name))
    }

    /// Sets a variable's value, walking the chain.
    pub fn set(&self, name: &str, value: Value) -> SetOutcome {
        let mut scope = self.inner.borrow_mut();
        if let Some(binding) = scope.bindings.get_mut(name) {
            if !binding.mutable {
                return SetOutcome::Immutable;
            }
            binding.value = value;
            return SetOutcome::Assigned;
        }
        match &scope.outer {
            Some(outer) => outer.set(name, value),
            None => SetOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_get() {
        let env = Environment::new();
        env.declare("x", Value::Number(1.0), true);
        assert_eq!(env.get("x"), Some(Value::Number(1.0)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn test_child_shadowing() {
        let outer = Environment::new();
        outer.declare("x", Value::Number(1.0), true);
        let inner = outer.child();
        inner.declare("x", Value::Number(2.0), true);
        assert_eq!(inner.get("x"), Some(Value::Number(2.0)));
        assert_eq!(outer.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_set_walks_chain() {
        let outer = Environment::new();
        outer.declare("x", Value::Number(1.0), true);
        let inner = outer.child();
        assert_eq!(inner.set("x", Value::Number(5.0)), SetOutcome::Assigned);
        assert_eq!(outer.get("x"), Some(Value::Number(5.0)));
    }

    #[test]
    fn test_const_is_immutable() {
        let env = Environment::new();
        env.declare("c", Value::Number(1.0), false);
        assert_eq!(env.set("c", Value::Number(2.0)), SetOutcome::Immutable);
    }

    #[test]
    fn test_set_unknown_reports_not_found() {
        let env = Environment::new();
        assert_eq!(env.set("nope", Value::Null), SetOutcome::NotFound);
    }
}
