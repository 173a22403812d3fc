//! Shader specification merging.
//!
//! Styles contribute shader fragments, defines, uniforms, and extension
//! requirements; mixing a chain of styles merges all four with rules that
//! keep diamond-shaped ancestry from contributing twice:
//!
//! - [`ShaderSpec`]: a style's shader contribution, authored or composed
//! - [`BlockFragment`]: one provenance-tagged source fragment in a slot
//! - [`UniformTable`]: the two-level uniform forwarding table

mod mix;
mod spec;
mod uniforms;

pub(crate) use mix::mix_shaders;
pub use spec::{BlockFragment, Extensions, ShaderSpec};
pub use uniforms::UniformTable;
