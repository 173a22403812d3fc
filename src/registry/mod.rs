//! The style registry and rebuild lifecycle.
//!
//! The registry holds two sets of styles. Base styles are persistent,
//! renderable prototypes registered up front; they survive every rebuild and
//! are reset in place rather than recreated. Active styles are the current
//! renderable set, rebuilt wholesale whenever the scene's style collection
//! changes.
//!
//! A rebuild runs four phases:
//!
//! 1. **Reset** — scene styles from the previous build are dropped; base
//!    styles clear their per-build state but keep their identity.
//! 2. **Sequence** — declarations are ordered so ancestors compose first.
//! 3. **Build** — each style is composed against the growing working set;
//!    compositions with a resolvable base join the active set, the rest stay
//!    intermediate.
//! 4. **Init** — the rendering pipeline's per-style hook runs for every
//!    active style.
//!
//! A separate [`compile`](StyleRegistry::compile) pass turns each active
//! style's merged shader spec into a program; failures there mark the one
//! style non-renderable without disturbing the rest.

mod base;

pub use base::{BaseStyle, Capabilities, ProgramScaffold, RenderState, TILE_SCALE, TILE_SIZE};

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Diagnostic, StyleError};
use crate::pipeline::RenderPipeline;
use crate::style::{build_order, compose, StyleDef, StyleLookup, WorkingSet};

/// A renderable composed style: a merged definition specialized by a
/// base-style prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    /// The fully merged definition.
    pub def: StyleDef,
    /// The base-style prototype this style specializes.
    pub prototype: String,
    /// Capability set inherited from the prototype.
    pub capabilities: Capabilities,
    /// Mutable per-build render state.
    pub state: RenderState,
}

impl ResolvedStyle {
    fn with_prototype(def: StyleDef, prototype: &BaseStyle) -> Self {
        Self {
            def,
            prototype: prototype.name.clone(),
            capabilities: prototype.capabilities.clone(),
            state: RenderState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Effective blend mode: the declared one, else the prototype's default.
    pub fn blend(&self) -> &str {
        self.def
            .blend
            .as_deref()
            .unwrap_or(&self.capabilities.default_blend)
    }

    /// Whether texture coordinates are needed, by declaration or prototype.
    pub fn texcoords(&self) -> bool {
        self.def.texcoords || self.capabilities.texcoords
    }

    /// Whether the style can currently render.
    pub fn renderable(&self) -> bool {
        !self.state.compile_failed
    }

    /// Clears per-build state, keeping the composed definition.
    pub fn reset(&mut self) {
        self.state = RenderState::default();
    }
}

/// Registry of base-style prototypes and the active composed set.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use stylemix::{BaseStyle, RenderPipeline, ResolvedStyle, StyleDef, StyleRegistry};
///
/// struct NoopPipeline;
///
/// impl RenderPipeline for NoopPipeline {
///     fn init(&mut self, _style: &ResolvedStyle) {}
///     fn compile(&mut self, _style: &ResolvedStyle) -> Result<(), Vec<String>> {
///         Ok(())
///     }
/// }
///
/// let mut registry = StyleRegistry::new();
/// for base in BaseStyle::builtin() {
///     registry.register(base);
/// }
///
/// let declarations: HashMap<String, StyleDef> = serde_yaml::from_str(
///     r#"
///     buildings:
///       base: polygons
///       shaders:
///         blocks:
///           color: "color.rgb *= vec3(0.9);"
///     windows:
///       mix: buildings
///       animated: true
///     "#,
/// )
/// .unwrap();
///
/// let mut pipeline = NoopPipeline;
/// registry.rebuild(&declarations, &mut pipeline).unwrap();
///
/// assert!(registry.get("buildings").is_some());
/// assert!(registry.get("windows").unwrap().def.animated);
/// ```
#[derive(Debug, Default)]
pub struct StyleRegistry {
    base: HashMap<String, BaseStyle>,
    active: HashMap<String, ResolvedStyle>,
    /// Intermediate compositions from the last build, kept so forwarded
    /// uniform reads can still reach their owning style.
    intermediates: HashMap<String, StyleDef>,
    scaffold: ProgramScaffold,
    diagnostics: Vec<Diagnostic>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the program-wide scaffold to the engine defaults, dropping any
    /// shared blocks a previous scene installed.
    pub fn init(&mut self) {
        self.scaffold = ProgramScaffold::default();
    }

    /// Registers a persistent base-style prototype.
    ///
    /// The prototype also becomes an active style in its own right, so
    /// scenes can draw with a bare `polygons` or `lines`. Registration is a
    /// setup-time operation; registering during an in-flight rebuild is not
    /// supported.
    pub fn register(&mut self, base: BaseStyle) {
        let entry = ResolvedStyle::with_prototype(base.seed(), &base);
        self.active.insert(base.name.clone(), entry);
        self.base.insert(base.name.clone(), base);
    }

    /// Removes a style from the active set.
    ///
    /// The base prototype, if one was registered under this name, stays
    /// available for `base:` references.
    pub fn remove(&mut self, name: &str) {
        self.active.remove(name);
    }

    /// Drops every scene-built style and resets the surviving base entries.
    pub fn clear(&mut self) {
        let base = &self.base;
        self.active.retain(|name, _| base.contains_key(name));
        for style in self.active.values_mut() {
            style.reset();
        }
        self.intermediates.clear();
        self.diagnostics.clear();
    }

    /// Rebuilds the active set from a declaration batch.
    ///
    /// Per-style configuration problems are reported through
    /// [`diagnostics`](Self::diagnostics) and prune only the styles they
    /// concern; the error return is reserved for a batch that cannot be
    /// sequenced at all.
    pub fn rebuild(
        &mut self,
        declarations: &HashMap<String, StyleDef>,
        pipeline: &mut dyn RenderPipeline,
    ) -> Result<(), StyleError> {
        if declarations.keys().any(|name| name.is_empty()) {
            return Err(StyleError::MalformedBatch {
                reason: "declaration with an empty name".to_string(),
            });
        }

        self.diagnostics.clear();
        self.intermediates.clear();

        // Reset phase.
        let mut next: HashMap<String, ResolvedStyle> = HashMap::new();
        for (name, mut style) in self.active.drain() {
            if self.base.contains_key(&name) {
                style.reset();
                next.insert(name, style);
            } else {
                log::trace!("dropping scene style '{name}' from previous build");
            }
        }

        // Sequencing phase.
        let order = build_order(declarations, &mut self.diagnostics);

        // Build phase, against a working set that grows ancestors-first.
        let mut working = WorkingSet::new();
        for name in &order {
            let Some(declared) = declarations.get(name) else {
                continue;
            };
            let mut def = declared.clone();
            def.name = name.clone();
            let merged = compose(&def, &working, &mut self.diagnostics);

            match merged.base.as_ref().and_then(|base| self.base.get(base)) {
                Some(prototype) => {
                    next.insert(
                        name.clone(),
                        ResolvedStyle::with_prototype(merged.clone(), prototype),
                    );
                }
                None => {
                    if let Some(base) = &merged.base {
                        log::debug!(
                            "style '{name}' names base '{base}' with no registered prototype"
                        );
                    }
                }
            }
            working.insert(name.clone(), merged);
        }

        // Publish wholesale; intermediates stay reachable for forwarding.
        for (name, def) in working.drain() {
            if !next.contains_key(&name) {
                self.intermediates.insert(name, def);
            }
        }
        self.active = next;

        // Initialization phase.
        let mut names: Vec<String> = self.active.keys().cloned().collect();
        names.sort();
        for name in &names {
            if let Some(style) = self.active.get_mut(name) {
                pipeline.init(style);
                style.state.initialized = true;
            }
        }

        log::debug!(
            "rebuilt {} active style(s), {} intermediate(s), {} diagnostic(s)",
            self.active.len(),
            self.intermediates.len(),
            self.diagnostics.len()
        );
        Ok(())
    }

    /// Compiles every active style through the rendering pipeline.
    ///
    /// A failure marks that one style non-renderable and records a
    /// diagnostic carrying the pipeline's shader messages; the remaining
    /// styles still compile and render.
    pub fn compile(&mut self, pipeline: &mut dyn RenderPipeline) {
        let mut names: Vec<String> = self.active.keys().cloned().collect();
        names.sort();
        for name in names {
            let Some(style) = self.active.get_mut(&name) else {
                continue;
            };
            match pipeline.compile(style) {
                Ok(()) => {
                    style.state.compiled = true;
                    log::trace!("compiled style '{name}'");
                }
                Err(messages) => {
                    style.state.compile_failed = true;
                    log::error!("error compiling style '{name}': {}", messages.join("; "));
                    self.diagnostics.push(Diagnostic::error(
                        name.clone(),
                        StyleError::Compile {
                            style: name.clone(),
                            diagnostics: messages,
                        },
                    ));
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedStyle> {
        self.active.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ResolvedStyle> {
        self.active.get_mut(name)
    }

    /// The current renderable set.
    pub fn styles(&self) -> &HashMap<String, ResolvedStyle> {
        &self.active
    }

    pub fn base_styles(&self) -> impl Iterator<Item = &BaseStyle> {
        self.base.values()
    }

    /// Diagnostics accumulated by the most recent rebuild and compile pass.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn scaffold(&self) -> &ProgramScaffold {
        &self.scaffold
    }

    pub fn scaffold_mut(&mut self) -> &mut ProgramScaffold {
        &mut self.scaffold
    }

    /// Reads a uniform on an active or intermediate style, following the
    /// forwarding table to the owning ancestor when needed.
    pub fn uniform(&self, style: &str, key: &str) -> Option<&Value> {
        let def = StyleLookup::style(self, style)?;
        def.uniform(key, self)
    }

    /// Sets a uniform on an active style's own table.
    ///
    /// Returns false when no active style has that name. Ancestors keep
    /// their own values; the new value shadows them for this style only.
    pub fn set_uniform(&mut self, style: &str, key: &str, value: Value) -> bool {
        match self.active.get_mut(style) {
            Some(resolved) => {
                resolved.def.set_uniform(key, value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Names of the active styles.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.active.keys().map(String::as_str)
    }
}

impl StyleLookup for StyleRegistry {
    fn style(&self, name: &str) -> Option<&StyleDef> {
        self.active
            .get(name)
            .map(|style| &style.def)
            .or_else(|| self.intermediates.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct RecordingPipeline {
        initialized: Vec<String>,
        fail: Vec<String>,
    }

    impl RecordingPipeline {
        fn new() -> Self {
            Self {
                initialized: Vec::new(),
                fail: Vec::new(),
            }
        }
    }

    impl RenderPipeline for RecordingPipeline {
        fn init(&mut self, style: &ResolvedStyle) {
            self.initialized.push(style.name().to_string());
        }

        fn compile(&mut self, style: &ResolvedStyle) -> Result<(), Vec<String>> {
            if self.fail.iter().any(|name| name == style.name()) {
                Err(vec!["0:1 syntax error".to_string()])
            } else {
                Ok(())
            }
        }
    }

    fn registry() -> StyleRegistry {
        let mut registry = StyleRegistry::new();
        for base in BaseStyle::builtin() {
            registry.register(base);
        }
        registry
    }

    fn decls(yaml: &str) -> HashMap<String, StyleDef> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_register_makes_base_active() {
        let registry = registry();
        assert!(registry.get("polygons").is_some());
        assert_eq!(registry.get("points").unwrap().blend(), "overlay");
    }

    #[test]
    fn test_rebuild_publishes_renderable_styles() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(
                &decls(
                    r#"
                    water: { base: polygons, animated: true }
                    roads: { base: lines }
                    "#,
                ),
                &mut pipeline,
            )
            .unwrap();

        assert!(registry.get("water").unwrap().def.animated);
        assert!(registry.get("roads").is_some());
        assert!(pipeline.initialized.contains(&"water".to_string()));
    }

    #[test]
    fn test_abstract_styles_are_not_active() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(
                &decls(
                    r#"
                    shared-glow: { shaders: { defines: { GLOW: 1 } } }
                    lit-roads: { base: lines, mix: shared-glow }
                    "#,
                ),
                &mut pipeline,
            )
            .unwrap();

        assert!(registry.get("shared-glow").is_none());
        let lit = registry.get("lit-roads").unwrap();
        assert_eq!(lit.def.shaders.as_ref().unwrap().defines["GLOW"], json!(1));
    }

    #[test]
    fn test_rebuild_drops_previous_scene_styles() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(&decls("water: { base: polygons }"), &mut pipeline)
            .unwrap();
        assert!(registry.get("water").is_some());

        registry
            .rebuild(&decls("terrain: { base: polygons }"), &mut pipeline)
            .unwrap();
        assert!(registry.get("water").is_none());
        assert!(registry.get("terrain").is_some());
        // Base styles survive the rebuild.
        assert!(registry.get("polygons").is_some());
    }

    #[test]
    fn test_base_entries_reset_not_recreated() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry.compile(&mut pipeline);
        assert!(registry.get("polygons").unwrap().state.compiled);

        registry
            .rebuild(&decls("water: { base: polygons }"), &mut pipeline)
            .unwrap();
        let polygons = registry.get("polygons").unwrap();
        assert!(!polygons.state.compiled, "state cleared by reset");
        assert!(polygons.state.initialized, "re-initialized after rebuild");
    }

    #[test]
    fn test_blend_defaults_to_prototype() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(
                &decls(
                    r#"
                    water: { base: polygons }
                    glass: { base: polygons, blend: add }
                    "#,
                ),
                &mut pipeline,
            )
            .unwrap();

        assert_eq!(registry.get("water").unwrap().blend(), "opaque");
        assert_eq!(registry.get("glass").unwrap().blend(), "add");
    }

    #[test]
    fn test_compile_failure_isolated_per_style() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(
                &decls(
                    r#"
                    good: { base: polygons }
                    bad: { base: polygons }
                    "#,
                ),
                &mut pipeline,
            )
            .unwrap();

        pipeline.fail.push("bad".to_string());
        registry.compile(&mut pipeline);

        assert!(registry.get("good").unwrap().renderable());
        let bad = registry.get("bad").unwrap();
        assert!(!bad.renderable(), "still present but not renderable");
        assert!(registry
            .diagnostics()
            .iter()
            .any(|d| matches!(d.error, StyleError::Compile { .. }) && d.style == "bad"));
    }

    #[test]
    fn test_uniform_forwarding_through_registry() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(
                &decls(
                    r#"
                    glow: { shaders: { uniforms: { u_intensity: 5 } } }
                    lit: { base: polygons, mix: glow }
                    "#,
                ),
                &mut pipeline,
            )
            .unwrap();

        // `glow` is intermediate, but the forwarded read still reaches it.
        assert_eq!(registry.uniform("lit", "u_intensity"), Some(&json!(5)));

        assert!(registry.set_uniform("lit", "u_intensity", json!(7)));
        assert_eq!(registry.uniform("lit", "u_intensity"), Some(&json!(7)));
        assert_eq!(registry.uniform("glow", "u_intensity"), Some(&json!(5)));
    }

    #[test]
    fn test_malformed_batch_is_fatal() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        let mut bad = HashMap::new();
        bad.insert(String::new(), StyleDef::default());

        let result = registry.rebuild(&bad, &mut pipeline);
        assert!(matches!(result, Err(StyleError::MalformedBatch { .. })));
    }

    #[test]
    fn test_clear_keeps_base_styles() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(&decls("water: { base: polygons }"), &mut pipeline)
            .unwrap();

        registry.clear();
        assert!(registry.get("water").is_none());
        assert!(registry.get("polygons").is_some());
    }

    #[test]
    fn test_scene_style_can_shadow_base_name() {
        let mut registry = registry();
        let mut pipeline = RecordingPipeline::new();
        registry
            .rebuild(
                &decls("polygons: { base: polygons, animated: true }"),
                &mut pipeline,
            )
            .unwrap();

        assert!(registry.get("polygons").unwrap().def.animated);
    }
}
