//! Style composition: merging a mixin chain into one definition.

use std::collections::{BTreeSet, HashMap};

use crate::error::{Diagnostic, StyleError};
use crate::shader::mix_shaders;

use super::def::StyleDef;
use super::lookup::WorkingSet;

/// Merges a style's ancestors and its own declaration into a single
/// definition.
///
/// The chain is the style's `mix` list resolved against the working set, in
/// declared order, with the style's own declaration last — so the style's
/// own values win wherever the merge rule is "last wins". References to the
/// style itself and to names missing from the working set are pruned with a
/// warning diagnostic rather than failing the style.
///
/// Field rules:
///
/// | Field | Rule |
/// |---|---|
/// | `animated`, `texcoords` | true if any chain member sets it |
/// | `base`, `lighting`, `texture` | last non-null value wins |
/// | `blend` | last *explicitly declared* value wins; never defaulted |
/// | `defines`, `material` | key union, later members overwrite |
/// | `shaders` | see [`crate::shader`] |
///
/// Composing an already-composed definition returns it unchanged.
pub fn compose(
    def: &StyleDef,
    working: &WorkingSet,
    diagnostics: &mut Vec<Diagnostic>,
) -> StyleDef {
    if def.is_composed() {
        return def.clone();
    }

    let mut mixed_from = BTreeSet::new();
    let mut chain: Vec<&StyleDef> = Vec::new();
    for parent in def.mix_names() {
        if *parent == def.name {
            log::warn!("style '{}' tries to mix itself", def.name);
            diagnostics.push(Diagnostic::warning(
                &def.name,
                StyleError::SelfMix {
                    style: def.name.clone(),
                },
            ));
            continue;
        }
        match working.get(parent) {
            Some(ancestor) => {
                mixed_from.insert(parent.clone());
                // The ancestor's own ancestry carries over, so the set always
                // holds every transitively reachable contributor.
                if let Some(ancestral) = &ancestor.mixed_from {
                    mixed_from.extend(ancestral.iter().cloned());
                }
                chain.push(ancestor);
            }
            None => {
                log::warn!("style '{}' mixes unknown style '{}'", def.name, parent);
                diagnostics.push(Diagnostic::warning(
                    &def.name,
                    StyleError::MissingAncestor {
                        style: def.name.clone(),
                        missing: parent.clone(),
                    },
                ));
            }
        }
    }

    let mut sources = chain;
    sources.push(def);

    let mut merged = def.clone();

    // Flags: true if any chain member sets them.
    merged.animated = sources.iter().any(|s| s.animated);
    merged.texcoords = sources.iter().any(|s| s.texcoords);

    // Overrides: last definition wins.
    merged.base = sources.iter().filter_map(|s| s.base.clone()).last();
    merged.texture = sources.iter().filter_map(|s| s.texture.clone()).last();
    merged.lighting = sources
        .iter()
        .filter_map(|s| s.lighting.clone())
        .filter(|v| !v.is_null())
        .last();

    // Blend participates only when explicitly declared on some chain member;
    // left unset it stays unset so the base style chooses at render time.
    merged.blend = sources.iter().filter_map(|s| s.blend.clone()).last();

    // Key-union merges.
    merged.defines = merge_maps(sources.iter().map(|s| &s.defines));
    merged.material = merge_maps(sources.iter().map(|s| &s.material));

    merged.shaders = Some(mix_shaders(&def.name, &sources, &mut mixed_from));
    merged.mixed_from = Some(mixed_from);
    merged
}

fn merge_maps<'a, I>(maps: I) -> HashMap<String, serde_json::Value>
where
    I: Iterator<Item = &'a HashMap<String, serde_json::Value>>,
{
    let mut merged = HashMap::new();
    for map in maps {
        merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}
