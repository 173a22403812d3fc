//! Base-style prototypes and the program-wide scaffold.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::style::StyleDef;

/// Tile grid constants the engine-wide defines derive from.
pub const TILE_SCALE: u32 = 4096;
pub const TILE_SIZE: u32 = 256;

/// Render-time capability set supplied by a base-style prototype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Blend mode used when a composed style does not declare one.
    pub default_blend: String,
    /// Whether the prototype requires texture coordinates.
    pub texcoords: bool,
}

impl Capabilities {
    pub fn opaque() -> Self {
        Self {
            default_blend: "opaque".to_string(),
            texcoords: false,
        }
    }

    pub fn overlay() -> Self {
        Self {
            default_blend: "overlay".to_string(),
            texcoords: true,
        }
    }
}

/// A persistent, renderable prototype that composed styles specialize.
///
/// Base styles are registered before any rebuild and live for the registry's
/// lifetime. Across rebuilds they are reset, not recreated, so references
/// held by the rendering pipeline stay valid. A composed style whose `base`
/// names a registered prototype becomes renderable with that prototype's
/// capability set; compositions with no resolvable base stay intermediate.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseStyle {
    pub name: String,
    pub capabilities: Capabilities,
}

impl BaseStyle {
    pub fn new(name: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            name: name.into(),
            capabilities,
        }
    }

    /// The built-in prototypes every scene starts from.
    pub fn builtin() -> Vec<BaseStyle> {
        vec![
            BaseStyle::new("polygons", Capabilities::opaque()),
            BaseStyle::new("lines", Capabilities::opaque()),
            BaseStyle::new("points", Capabilities::overlay()),
            BaseStyle::new("text", Capabilities::overlay()),
        ]
    }

    /// Definition seed for the prototype's own registry entry.
    pub(crate) fn seed(&self) -> StyleDef {
        let mut def = StyleDef::named(&self.name);
        def.base = Some(self.name.clone());
        def.texcoords = self.capabilities.texcoords;
        def.mixed_from = Some(BTreeSet::new());
        def
    }
}

/// Mutable per-build render state carried by a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub initialized: bool,
    pub compiled: bool,
    pub compile_failed: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            initialized: false,
            compiled: false,
            compile_failed: false,
        }
    }
}

static ENGINE_DEFINES: Lazy<HashMap<String, Value>> = Lazy::new(|| {
    let mut defines = HashMap::new();
    // Minimum value for float comparisons.
    defines.insert("STYLEMIX_EPSILON".to_string(), json!(0.00001));
    // Assume a 16-bit depth buffer, 14 bits used: one extra bit for virtual
    // half-layers (outlines between layers), one against precision loss.
    defines.insert(
        "STYLEMIX_LAYER_DELTA".to_string(),
        json!(1.0 / f64::from(1 << 14)),
    );
    defines.insert(
        "STYLEMIX_TILE_SCALE".to_string(),
        json!(format!(
            "vec3({TILE_SCALE}., {TILE_SCALE}., u_meters_per_pixel * {TILE_SIZE}.)"
        )),
    );
    defines
});

/// Program-wide defines and shared shader blocks.
///
/// Installed once per scene, ahead of any per-style contribution: the
/// rendering pipeline adds its shared snippets (attribute unpacking, world
/// position accessors, layer ordering) to the `global` and `setup` slots and
/// prepends these defines when assembling every program.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramScaffold {
    pub defines: HashMap<String, Value>,
    blocks: HashMap<String, Vec<String>>,
}

impl Default for ProgramScaffold {
    fn default() -> Self {
        Self {
            defines: ENGINE_DEFINES.clone(),
            blocks: HashMap::new(),
        }
    }
}

impl ProgramScaffold {
    /// Appends a shared source block to a slot.
    pub fn add_block(&mut self, slot: impl Into<String>, source: impl Into<String>) {
        self.blocks.entry(slot.into()).or_default().push(source.into());
    }

    /// Replaces a slot's blocks with a single source block.
    pub fn replace_block(&mut self, slot: impl Into<String>, source: impl Into<String>) {
        self.blocks.insert(slot.into(), vec![source.into()]);
    }

    /// Removes every block in a slot.
    pub fn remove_block(&mut self, slot: &str) {
        self.blocks.remove(slot);
    }

    pub fn block(&self, slot: &str) -> &[String] {
        self.blocks.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }
}
