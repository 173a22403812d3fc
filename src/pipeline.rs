//! Hooks into the external rendering pipeline.

use crate::registry::ResolvedStyle;

/// Per-style hooks the rendering pipeline supplies to the registry.
///
/// The registry drives these at fixed points of its lifecycle: `init` once
/// for every active style after a rebuild publishes, `compile` during the
/// separate compile pass. Implementations carry whatever scene state they
/// need (GL context, program cache, selection buffers); the registry only
/// hands them the composed style.
pub trait RenderPipeline {
    /// Called for each active style once a rebuild completes.
    fn init(&mut self, style: &ResolvedStyle);

    /// Assembles and compiles the style's merged shader spec into a GPU
    /// program.
    ///
    /// On failure, returns the shader diagnostics. The registry keeps the
    /// style active but marks it non-renderable; other styles are not
    /// affected.
    fn compile(&mut self, style: &ResolvedStyle) -> Result<(), Vec<String>>;
}
