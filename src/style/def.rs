//! Style declarations and merged definitions.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shader::ShaderSpec;
use crate::style::StyleLookup;

/// Ancestor reference(s) for a style: a single name or an ordered list.
///
/// Scene files may write either form:
///
/// ```yaml
/// mix: base-lines
/// ```
///
/// ```yaml
/// mix: [base-lines, dashes, glow]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Mix {
    Single(String),
    List(Vec<String>),
}

impl Mix {
    /// Ancestor names in declared order.
    pub fn names(&self) -> &[String] {
        match self {
            Mix::Single(name) => std::slice::from_ref(name),
            Mix::List(names) => names,
        }
    }
}

/// A named style definition.
///
/// The same type carries a style through its whole life: the scene loader
/// deserializes raw declarations into it, and composition produces a fully
/// merged copy, marked by [`StyleDef::is_composed`]. The engine always works
/// on owned clones; a caller's declarations are never mutated in place.
///
/// # Example
///
/// ```rust
/// use stylemix::StyleDef;
///
/// let def: StyleDef = serde_yaml::from_str(
///     r#"
///     base: polygons
///     mix: [windows, night-lights]
///     animated: true
///     material:
///       diffuse: 0.8
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(def.mix_names(), ["windows", "night-lights"]);
/// assert!(def.animated);
/// assert!(!def.is_composed());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDef {
    /// Unique style name, filled from the declaration key by the loader.
    #[serde(skip)]
    pub name: String,

    /// Name of the style to import from a remote document, when it differs
    /// from the local key.
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    /// Styles whose contributions this one inherits, in declared order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix: Option<Mix>,

    /// External document to import this style from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Whether the style animates (requests a redraw every frame).
    pub animated: bool,

    /// Whether vertex texture coordinates are generated.
    pub texcoords: bool,

    /// Base style prototype this style specializes. Styles without a
    /// resolvable base are intermediate: they compose but never render.
    pub base: Option<String>,

    /// Lighting mode override (`fragment`, `vertex`, or `false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting: Option<Value>,

    /// Texture override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,

    /// Blend mode. Only meaningful when explicitly declared; when left unset
    /// the base style supplies its default at render time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blend: Option<String>,

    /// Preprocessor defines, merged key-wise across the mixin chain.
    pub defines: HashMap<String, Value>,

    /// Material parameters, merged key-wise across the mixin chain.
    pub material: HashMap<String, Value>,

    /// Shader contributions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shaders: Option<ShaderSpec>,

    /// Every ancestor that contributed to this style, direct or transitive,
    /// each counted once no matter how many mixin paths reach it. `Some`
    /// once composition has run; composing again is then a no-op.
    #[serde(skip)]
    pub mixed_from: Option<BTreeSet<String>>,
}

impl StyleDef {
    /// Creates an empty definition with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Ancestor names in declared order; empty when the style mixes nothing.
    pub fn mix_names(&self) -> &[String] {
        self.mix.as_ref().map(Mix::names).unwrap_or(&[])
    }

    /// Whether composition has already run on this definition.
    pub fn is_composed(&self) -> bool {
        self.mixed_from.is_some()
    }

    /// Reads a uniform, forwarding to the owning ancestor when the value is
    /// not explicitly set on this style.
    pub fn uniform<'a>(&'a self, key: &str, styles: &'a dyn StyleLookup) -> Option<&'a Value> {
        self.shaders.as_ref()?.uniforms.get(key, &self.name, styles)
    }

    /// Sets a uniform on this style's own table, shadowing any inherited
    /// value without touching the ancestor that supplied it.
    pub fn set_uniform(&mut self, key: impl Into<String>, value: Value) {
        self.shaders
            .get_or_insert_with(ShaderSpec::default)
            .uniforms
            .set(key, value);
    }
}
