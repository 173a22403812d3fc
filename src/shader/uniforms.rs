//! Uniform values with ancestor forwarding.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::style::StyleLookup;

/// A two-level uniform table.
///
/// Each style keeps the uniform values it explicitly authored in its own
/// map. For every uniform key known anywhere in its mixin chain, the table
/// also records which style owns the key — the nearest chain member that
/// authored it. Reading a key returns the own value if present, otherwise
/// forwards a single level to the owner's own map, resolved live at read
/// time. Writing always lands in the own map, shadowing the ancestor
/// without mutating it.
///
/// Only the own map serializes: the scope table is rebuilt by composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniformTable {
    own: HashMap<String, Value>,
    #[serde(skip)]
    scopes: HashMap<String, String>,
}

impl UniformTable {
    /// Resolves a uniform for the style named `reader` (the table's owner).
    ///
    /// Forwarding is at most one indirection deep: the recorded owner is
    /// always the style that authored the value, never an intermediate. An
    /// owner entry pointing back at the reader (left behind when a
    /// previously-authored value is [`unset`](Self::unset)) resolves to
    /// `None` instead of recursing.
    pub fn get<'a>(
        &'a self,
        key: &str,
        reader: &str,
        styles: &'a dyn StyleLookup,
    ) -> Option<&'a Value> {
        if let Some(value) = self.own.get(key) {
            return Some(value);
        }
        let owner = self.scopes.get(key)?;
        if owner == reader {
            return None;
        }
        styles.style(owner)?.shaders.as_ref()?.uniforms.own_value(key)
    }

    /// Sets a value on this style's own map.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.own.insert(key.into(), value);
    }

    /// Removes an own value, re-exposing whatever an ancestor supplies.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.own.remove(key)
    }

    /// Value explicitly authored on this style, ignoring ancestors.
    pub fn own_value(&self, key: &str) -> Option<&Value> {
        self.own.get(key)
    }

    pub fn own_keys(&self) -> impl Iterator<Item = &String> {
        self.own.keys()
    }

    /// The style that owns `key`, when known.
    pub fn owner(&self, key: &str) -> Option<&str> {
        self.scopes.get(key).map(String::as_str)
    }

    pub(crate) fn scopes(&self) -> impl Iterator<Item = (&String, &String)> {
        self.scopes.iter()
    }

    pub(crate) fn record_scope(&mut self, key: String, owner: String) {
        self.scopes.insert(key, owner);
    }

    pub(crate) fn set_own(&mut self, own: HashMap<String, Value>) {
        self.own = own;
    }

    pub(crate) fn own_map(&self) -> &HashMap<String, Value> {
        &self.own
    }

    /// Every uniform key this table knows, own or inherited.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .own
            .keys()
            .chain(self.scopes.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Flattens the table into concrete values for program assembly.
    ///
    /// Keys whose owner no longer supplies a value are omitted.
    pub fn resolved(&self, reader: &str, styles: &dyn StyleLookup) -> BTreeMap<String, Value> {
        self.names()
            .into_iter()
            .filter_map(|key| {
                self.get(key, reader, styles)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.own.is_empty() && self.scopes.is_empty()
    }
}
