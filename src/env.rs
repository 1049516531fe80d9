// ABOUTME: Lexically-scoped environment used by the tree-walking interpreter

use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// An `Rc`-linked chain of scopes. This is the hardened resolution of the
/// snapshot-and-restore dynamic scoping the bytecode VM uses literally: a
/// call creates one child `Environment` per invocation instead of copying
/// the whole globals map, so closures capture the scope they were defined
/// in rather than whatever happens to be live at call time.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Defines a binding in THIS scope (doesn't walk the parent chain).
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    /// Looks up a name in this scope and parent scopes recursively.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Updates an existing binding wherever it's defined (used by
    /// assignment statements, not `let`).
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(ref parent) = self.parent {
            return parent.set(name, value);
        }
        Err(RuntimeError::name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x".to_string(), Value::Int(42));
        assert!(matches!(env.get("x"), Some(Value::Int(42))));
    }

    #[test]
    fn undefined_name_is_none() {
        let env = Environment::new();
        assert!(env.get("undefined").is_none());
    }

    #[test]
    fn child_shadows_parent() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Int(42));
        let child = Environment::with_parent(parent);
        child.define("x".to_string(), Value::Int(100));
        assert!(matches!(child.get("x"), Some(Value::Int(100))));
    }

    #[test]
    fn child_sees_parent_bindings() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Int(42));
        let child = Environment::with_parent(parent);
        assert!(matches!(child.get("x"), Some(Value::Int(42))));
    }

    #[test]
    fn multiple_levels_resolve() {
        let grandparent = Environment::new();
        grandparent.define("a".to_string(), Value::Int(1));
        let parent = Environment::with_parent(grandparent);
        parent.define("b".to_string(), Value::Int(2));
        let child = Environment::with_parent(parent);
        child.define("c".to_string(), Value::Int(3));

        assert!(matches!(child.get("a"), Some(Value::Int(1))));
        assert!(matches!(child.get("b"), Some(Value::Int(2))));
        assert!(matches!(child.get("c"), Some(Value::Int(3))));
    }

    #[test]
    fn set_updates_parent_binding() {
        let parent = Environment::new();
        parent.define("x".to_string(), Value::Int(1));
        let child = Environment::with_parent(parent.clone());
        child.set("x", Value::Int(2)).unwrap();
        assert!(matches!(parent.get("x"), Some(Value::Int(2))));
    }

    #[test]
    fn set_on_undefined_name_errors() {
        let env = Environment::new();
        assert!(env.set("missing", Value::Nil).is_err());
    }
}
