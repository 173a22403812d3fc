//! Dependency ordering for style composition.
//!
//! Styles compose against a working set that accumulates ancestors-first, so
//! a batch must be built in an order where every style follows everything it
//! mixes. The order is derived from each style's inheritance depth: 0 for a
//! style that mixes nothing, otherwise one more than its deepest ancestor.

use std::collections::HashMap;

use crate::error::{Diagnostic, StyleError};

use super::def::StyleDef;

/// Computes a build order in which every style's direct and transitive
/// ancestors precede it.
///
/// Ties (equal depth) resolve to name order, so the result is deterministic
/// for identical inputs regardless of map iteration order. Self-referential
/// edges contribute nothing to depth; cyclic ancestry is reported as an
/// error diagnostic and the re-entrant edge is cut rather than followed.
/// Mixing a name absent from the set terminates that branch at its current
/// depth (the missing reference itself is reported during composition).
pub fn build_order(
    styles: &HashMap<String, StyleDef>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<String> {
    let mut names: Vec<&String> = styles.keys().collect();
    names.sort();

    let mut cache = HashMap::new();
    let mut ordered: Vec<(String, usize)> = names
        .into_iter()
        .map(|name| {
            let depth = inheritance_depth(name, styles, &mut Vec::new(), &mut cache, diagnostics);
            (name.clone(), depth)
        })
        .collect();

    // Stable: equal depths keep the name order established above.
    ordered.sort_by_key(|(_, depth)| *depth);
    ordered.into_iter().map(|(name, _)| name).collect()
}

/// Length of the longest mixin chain above `name`.
fn inheritance_depth(
    name: &str,
    styles: &HashMap<String, StyleDef>,
    path: &mut Vec<String>,
    cache: &mut HashMap<String, usize>,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    if let Some(&depth) = cache.get(name) {
        return depth;
    }

    // A reference to a style that isn't in the batch ends the chain here.
    let Some(style) = styles.get(name) else {
        return 0;
    };

    if style.mix.is_none() {
        cache.insert(name.to_string(), 0);
        return 0;
    }

    if path.iter().any(|visited| visited == name) {
        let mut cycle = path.clone();
        cycle.push(name.to_string());
        log::warn!("cyclic style ancestry: {}", cycle.join(" -> "));
        diagnostics.push(Diagnostic::error(
            name,
            StyleError::CyclicAncestry { path: cycle },
        ));
        return 0;
    }

    path.push(name.to_string());
    let mut deepest = 0;
    for parent in style.mix_names() {
        if parent == name {
            // Trying to mix into itself; the edge contributes nothing.
            continue;
        }
        deepest = deepest.max(inheritance_depth(parent, styles, path, cache, diagnostics));
    }
    path.pop();

    let depth = 1 + deepest;
    cache.insert(name.to_string(), depth);
    depth
}
