//! Merging shader specifications across a mixin chain.

use std::collections::{BTreeSet, HashSet};

use super::spec::{Extensions, ShaderSpec};
use crate::style::StyleDef;

/// Merges the shader specs of a mixin chain into one composed spec.
///
/// `sources` is the same ancestors-then-self chain the field merge uses; the
/// style's own declaration is the last member. Members without a shader spec
/// contribute nothing.
///
/// - `defines`: key union, later members overwrite.
/// - `extensions`: set union of every member's requirements.
/// - `uniforms`: the own map holds only values authored on the style itself;
///   every key any member knows gets an owner scope, nearest declaration
///   winning, so reads resolve with a single forwarding hop.
/// - `blocks`: fragments append in chain order, each tagged with the name of
///   the style that originally contributed it. A scope that has already been
///   merged is skipped wherever it shows up again — the same ancestor
///   reached through two mixin paths contributes exactly once.
///
/// Scopes consumed from each member are unioned into `mixed_from` once that
/// member is done, which is how ancestors discovered only through deep block
/// merging (beyond the direct `mix` list) get recorded.
pub(crate) fn mix_shaders(
    style_name: &str,
    sources: &[&StyleDef],
    mixed_from: &mut BTreeSet<String>,
) -> ShaderSpec {
    let merges: Vec<(&str, &ShaderSpec)> = sources
        .iter()
        .filter_map(|s| s.shaders.as_ref().map(|sh| (s.name.as_str(), sh)))
        .collect();

    let mut out = ShaderSpec::default();

    // Defines.
    for (_, spec) in &merges {
        out.defines
            .extend(spec.defines.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    // Uniform ownership. Composed ancestors already carry the authoring
    // style per key; raw members own whatever they author themselves.
    for (name, spec) in &merges {
        for (key, owner) in spec.uniforms.scopes() {
            out.uniforms.record_scope(key.clone(), owner.clone());
        }
        for key in spec.uniforms.own_keys() {
            out.uniforms.record_scope(key.clone(), (*name).to_string());
        }
    }
    if let Some(own) = sources.last().and_then(|s| s.shaders.as_ref()) {
        out.uniforms.set_own(own.uniforms.own_map().clone());
    }

    // Extensions.
    let mut extensions: BTreeSet<String> = BTreeSet::new();
    for (_, spec) in &merges {
        extensions.extend(spec.extension_names().iter().cloned());
    }
    if !extensions.is_empty() {
        out.extensions = Some(Extensions::List(extensions.into_iter().collect()));
    }

    // Blocks, with diamond collapse over contribution scopes.
    let mut consumed: HashSet<String> = HashSet::new();
    for (name, spec) in &merges {
        if spec.blocks.is_empty() {
            continue;
        }
        let mut consumed_here: BTreeSet<String> = BTreeSet::new();

        for (slot, fragments) in &spec.blocks {
            for fragment in fragments {
                // Untagged fragments belong to the member declaring them;
                // tagged ones keep the style that originally wrote them.
                let scope = fragment.scope().unwrap_or(*name).to_string();

                // Repeated scope means a diamond: this ancestor's blocks came
                // through another chain member already.
                if consumed.contains(&scope) {
                    log::trace!("style '{style_name}': block scope '{scope}' already merged");
                    continue;
                }
                consumed_here.insert(scope.clone());

                out.blocks
                    .entry(slot.clone())
                    .or_default()
                    .push(fragment.rescoped(scope));
            }
        }

        for scope in consumed_here {
            if scope != style_name {
                mixed_from.insert(scope.clone());
            }
            consumed.insert(scope);
        }
    }

    out
}
