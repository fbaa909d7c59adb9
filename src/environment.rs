//! Environment manager: the live name-to-value bindings seen by field code
//!
//! One [`Environment`] lives inside each formatter. A formatting call saves a
//! [`Snapshot`], extends the bindings with the caller's variables, renders, and
//! restores the snapshot afterwards. Snapshots are values held by the caller,
//! so nested calls each keep their own on the Rust call stack instead of
//! sharing a single save slot.
//!
//! Snapshots are shallow: lists and dicts are shared by reference, so a field
//! that mutates a container the caller passed in is visible to the caller.

use std::collections::BTreeMap;

use crate::interpreter::Value;

/// Saved copy of an environment's bindings
#[derive(Debug, Clone)]
pub struct Snapshot {
    bindings: BTreeMap<String, Value>,
}

/// Name-to-value mapping, ordered by name
#[derive(Debug, Clone)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
    self_name: String,
}

impl Environment {
    /// Fresh environment holding only the self-reference binding
    pub fn new(self_name: impl Into<String>) -> Self {
        let mut env = Self {
            bindings: BTreeMap::new(),
            self_name: self_name.into(),
        };
        env.reset();
        env
    }

    /// Name bound to the formatter itself
    pub fn self_name(&self) -> &str {
        &self.self_name
    }

    /// Capture the current bindings
    pub fn save(&self) -> Snapshot {
        Snapshot {
            bindings: self.bindings.clone(),
        }
    }

    /// Replace the current bindings with a saved copy
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.bindings = snapshot.bindings;
    }

    /// Merge bindings, overwriting names already bound
    pub fn extend<I, K, V>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.bindings.extend(
            bindings
                .into_iter()
                .map(|(name, value)| (name.into(), value.into())),
        );
    }

    /// Drop every binding except the self-reference
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.bindings.insert(self.self_name.clone(), Value::Format);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bound names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new("format")
    }
}
