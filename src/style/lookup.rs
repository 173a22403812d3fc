//! Style lookup scopes.

use std::collections::HashMap;

use super::def::StyleDef;

/// Resolves a style name to its merged definition.
///
/// Uniform forwarding reads resolve against whichever scope is current: the
/// working set while a build pass is running, or the registry afterwards.
pub trait StyleLookup {
    fn style(&self, name: &str) -> Option<&StyleDef>;
}

impl StyleLookup for HashMap<String, StyleDef> {
    fn style(&self, name: &str) -> Option<&StyleDef> {
        self.get(name)
    }
}

/// The set of styles composed so far during one build pass.
///
/// Styles are inserted in dependency order, so every ancestor a style mixes
/// is already present (and fully merged) by the time that style composes.
/// The set is scoped to a single pass and discarded when the pass ends.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    styles: HashMap<String, StyleDef>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a composed style under the given key.
    ///
    /// The key is the declaration-set key, which for remote imports may
    /// differ from the definition's own name.
    pub fn insert(&mut self, key: impl Into<String>, def: StyleDef) {
        self.styles.insert(key.into(), def);
    }

    pub fn get(&self, key: &str) -> Option<&StyleDef> {
        self.styles.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StyleDef> {
        self.styles.remove(key)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Drains all composed styles out of the set.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, StyleDef)> + '_ {
        self.styles.drain()
    }
}

impl StyleLookup for WorkingSet {
    fn style(&self, name: &str) -> Option<&StyleDef> {
        self.styles.get(name)
    }
}
