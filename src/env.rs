//! Lexically nested name→value environments.
//!
//! Ported from `original_source/musique/env.hh`: a map plus an optional
//! parent, always held behind shared ownership because a captured [`Block`](crate::value::block::Block)
//! keeps its defining environment alive. Rust's `Rc<RefCell<_>>` stands in
//! for the original's `shared_ptr<Env>`.

use crate::value::Value;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Env_Data {
    variables: HashMap<String, Value>,
    parent: Option<Env>,
}

/// A shared handle to an environment frame.
#[derive(Debug, Clone)]
pub struct Env(Rc<RefCell<Env_Data>>);

impl Env {
    pub fn global() -> Self {
        Env(Rc::new(RefCell::new(Env_Data {
            variables: HashMap::new(),
            parent: None,
        })))
    }

    /// Creates a new child scope rooted at `self`.
    pub fn enter(&self) -> Env {
        trace!("entering child scope");
        Env(Rc::new(RefCell::new(Env_Data {
            variables: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Defines (or overwrites) a binding in this exact frame, regardless of
    /// whether an outer scope already defines the same name — this is how
    /// `:=` always introduces a fresh local binding.
    pub fn force_define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().variables.insert(name.into(), value);
    }

    /// Walks the parent chain looking for `name`, returning a clone of its value.
    pub fn find(&self, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(v) = data.variables.get(name) {
            return Some(v.clone());
        }
        match &data.parent {
            Some(parent) => parent.find(name),
            None => None,
        }
    }

    /// Reassigns an existing binding, searching outward; returns false if no
    /// enclosing scope defines `name`.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut data = self.0.borrow_mut();
        if let Some(slot) = data.variables.get_mut(name) {
            *slot = value;
            return true;
        }
        match &data.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::Number;

    #[test]
    fn find_walks_parent_chain() {
        let global = Env::global();
        global.force_define("x", Value::Number(Number::integer(1)));
        let child = global.enter();
        assert_eq!(child.find("x"), Some(Value::Number(Number::integer(1))));
    }

    #[test]
    fn shadowing_in_child_does_not_affect_parent() {
        let global = Env::global();
        global.force_define("x", Value::Number(Number::integer(1)));
        let child = global.enter();
        child.force_define("x", Value::Number(Number::integer(2)));
        assert_eq!(global.find("x"), Some(Value::Number(Number::integer(1))));
        assert_eq!(child.find("x"), Some(Value::Number(Number::integer(2))));
    }

    #[test]
    fn assign_requires_existing_binding() {
        let global = Env::global();
        assert!(!global.assign("missing", Value::Nil));
        global.force_define("y", Value::Nil);
        let child = global.enter();
        assert!(child.assign("y", Value::Number(Number::integer(5))));
        assert_eq!(global.find("y"), Some(Value::Number(Number::integer(5))));
    }
}
