use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{Symbol, Value};

/// A lexical scope: bindings plus an optional link to the enclosing frame.
///
/// Frames are shared through `Rc` by every closure and child frame that refers
/// to them, so bindings live behind a `RefCell`. Parent links only point to
/// frames that existed before the child, which keeps every chain finite.
#[derive(Default)]
pub struct Frame {
    bindings: RefCell<HashMap<Symbol, Value>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }
    }

    pub fn with_parent(parent: Rc<Frame>) -> Self {
        Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    pub fn with_bindings(bindings: HashMap<Symbol, Value>, parent: Option<Rc<Frame>>) -> Self {
        Frame {
            bindings: RefCell::new(bindings),
            parent,
        }
    }

    pub fn parent(&self) -> Option<&Rc<Frame>> {
        self.parent.as_ref()
    }

    /// Look up a symbol in this frame, then in each ancestor.
    pub fn lookup(&self, symbol: &Symbol) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(symbol) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(symbol))
    }

    /// Bind in this frame only, shadowing any ancestor binding.
    pub fn bind(&self, symbol: Symbol, value: Value) {
        self.bindings.borrow_mut().insert(symbol, value);
    }

    pub fn is_bound_locally(&self, symbol: &Symbol) -> bool {
        self.bindings.borrow().contains_key(symbol)
    }

    /// Update the binding in the nearest frame that has one. If no frame in
    /// the chain binds the symbol, a new binding is created in this frame.
    pub fn set(&self, symbol: Symbol, value: Value) {
        let mut current = Some(self);
        while let Some(frame) = current {
            if frame.is_bound_locally(&symbol) {
                frame.bind(symbol, value);
                return;
            }
            current = frame.parent.as_deref();
        }
        self.bind(symbol, value);
    }

    /// Get all bindings visible from this frame, inner bindings shadowing
    /// outer ones. Returns (name, value) pairs sorted by name.
    pub fn get_all_bindings(&self) -> Vec<(Symbol, Value)> {
        let mut bindings = HashMap::new();

        if let Some(parent) = &self.parent {
            for (name, value) in parent.get_all_bindings() {
                bindings.insert(name, value);
            }
        }

        for (name, value) in self.bindings.borrow().iter() {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl fmt::Debug for Frame {
    // Only names are printed; values may be closures that refer back to this frame.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .bindings
            .borrow()
            .keys()
            .map(|s| s.name().to_owned())
            .collect();
        names.sort();
        f.debug_struct("Frame")
            .field("bindings", &names)
            .field("parent", &self.parent)
            .finish()
    }
}
