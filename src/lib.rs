//! Style composition and shader mixin resolution for vector map rendering.
//!
//! A scene declares named visual styles that may extend one another through
//! `mix` references — possibly along multiple, overlapping ancestry chains.
//! This crate resolves such a declaration set into fully merged render
//! configurations: for every style, one definition with correct override
//! precedence, no duplicated contributions from diamond-shaped ancestry, and
//! a merged shader specification (defines, a forwarding uniform table, an
//! extension set, and provenance-tagged source blocks per slot) ready for
//! program assembly.
//!
//! The crate does not fetch tiles, tessellate geometry, lay out labels, or
//! talk to the GPU. It consumes declarations an external loader already
//! parsed, pulls remote styles and shader blocks through a caller-supplied
//! [`FetchText`] capability, and hands composed styles to the rendering
//! pipeline through the [`RenderPipeline`] hooks.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use stylemix::{BaseStyle, RenderPipeline, ResolvedStyle, StyleDef, StyleRegistry};
//!
//! struct NoopPipeline;
//!
//! impl RenderPipeline for NoopPipeline {
//!     fn init(&mut self, _style: &ResolvedStyle) {}
//!     fn compile(&mut self, _style: &ResolvedStyle) -> Result<(), Vec<String>> {
//!         Ok(())
//!     }
//! }
//!
//! // Declarations normally come from the scene loader.
//! let declarations: HashMap<String, StyleDef> = serde_yaml::from_str(
//!     r#"
//!     terrain:
//!       base: polygons
//!       shaders:
//!         uniforms: { u_snow_line: 2200 }
//!         blocks:
//!           color: "color.rgb = mix(color.rgb, vec3(1.), snow(position.z));"
//!     peaks:
//!       mix: terrain
//!       animated: true
//!     "#,
//! )
//! .unwrap();
//!
//! let mut registry = StyleRegistry::new();
//! for base in BaseStyle::builtin() {
//!     registry.register(base);
//! }
//! registry.rebuild(&declarations, &mut NoopPipeline).unwrap();
//!
//! // `peaks` inherited terrain's block and forwards its uniform.
//! let peaks = registry.get("peaks").unwrap();
//! assert_eq!(peaks.def.shaders.as_ref().unwrap().block("color").len(), 1);
//! assert_eq!(
//!     registry.uniform("peaks", "u_snow_line"),
//!     Some(&serde_json::json!(2200))
//! );
//! ```

pub mod error;
pub mod pipeline;
pub mod registry;
pub mod remote;
pub mod shader;
pub mod style;

pub use error::{Diagnostic, FetchFailure, Severity, StyleError};
pub use pipeline::RenderPipeline;
pub use registry::{
    BaseStyle, Capabilities, ProgramScaffold, RenderState, ResolvedStyle, StyleRegistry,
};
pub use remote::{load_remote_styles, load_shader_blocks, FetchText};
pub use shader::{BlockFragment, Extensions, ShaderSpec, UniformTable};
pub use style::{build_order, compose, Mix, StyleDef, StyleLookup, WorkingSet};
