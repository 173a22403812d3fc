//! Style declarations, dependency ordering, and composition.
//!
//! This module provides the non-shader half of style composition:
//!
//! - [`StyleDef`]: a style declaration, and after composition, its fully
//!   merged definition
//! - [`build_order`]: dependency ordering so ancestors compose first
//! - [`compose`]: the per-style merge of a mixin chain
//! - [`WorkingSet`] / [`StyleLookup`]: the scope composed styles resolve
//!   ancestor lookups against
//!
//! Shader-specific merging lives in [`crate::shader`]; the rebuild lifecycle
//! that drives both lives in [`crate::registry`].

mod compose;
mod def;
mod lookup;
mod order;

pub use compose::compose;
pub use def::{Mix, StyleDef};
pub use lookup::{StyleLookup, WorkingSet};
pub use order::build_order;
