//! End-to-end rebuild tests.
//!
//! These exercise the whole pipeline the way a scene load does: remote
//! prefetch, dependency ordering, composition, registration, and the
//! compile pass, with realistic scene-style declaration sets.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use stylemix::{
    load_remote_styles, load_shader_blocks, BaseStyle, FetchFailure, FetchText, RenderPipeline,
    ResolvedStyle, Severity, StyleDef, StyleError, StyleRegistry,
};

struct RecordingPipeline {
    initialized: Vec<String>,
    fail_compile: Vec<String>,
    compiled: Vec<String>,
}

impl RecordingPipeline {
    fn new() -> Self {
        Self {
            initialized: Vec::new(),
            fail_compile: Vec::new(),
            compiled: Vec::new(),
        }
    }
}

impl RenderPipeline for RecordingPipeline {
    fn init(&mut self, style: &ResolvedStyle) {
        self.initialized.push(style.name().to_string());
    }

    fn compile(&mut self, style: &ResolvedStyle) -> Result<(), Vec<String>> {
        if self.fail_compile.iter().any(|name| name == style.name()) {
            Err(vec![format!("0:3 '{}': undeclared identifier", style.name())])
        } else {
            self.compiled.push(style.name().to_string());
            Ok(())
        }
    }
}

struct MapFetcher(HashMap<String, String>);

#[async_trait]
impl FetchText for MapFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchFailure> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| FetchFailure::new("connection refused"))
    }
}

fn registry() -> StyleRegistry {
    let mut registry = StyleRegistry::new();
    registry.init();
    for base in BaseStyle::builtin() {
        registry.register(base);
    }
    registry
}

fn decls(yaml: &str) -> HashMap<String, StyleDef> {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_full_scene_rebuild() {
    let declarations = decls(
        r#"
        water:
          base: polygons
          animated: true
          lighting: fragment
          shaders:
            uniforms: { u_wave_height: 0.4 }
            blocks:
              position: "position.z += wave(position.xy, u_time);"
              color: "color.rgb *= vec3(0.3, 0.6, 0.9);"
        rivers:
          base: lines
          mix: water
          shaders:
            blocks:
              color: "color.a *= 0.8;"
        hills:
          base: polygons
          material: { diffuse: 0.7 }
        "#,
    );

    let mut registry = registry();
    let mut pipeline = RecordingPipeline::new();
    registry.rebuild(&declarations, &mut pipeline).unwrap();

    // Flags and scalars merged through the chain.
    let rivers = registry.get("rivers").unwrap();
    assert!(rivers.def.animated, "inherited from water");
    assert_eq!(rivers.def.lighting, Some(json!("fragment")));
    assert_eq!(rivers.def.base.as_deref(), Some("lines"), "own base wins");

    // Ancestor block before own block, provenance preserved.
    let spec = rivers.def.shaders.as_ref().unwrap();
    let color_scopes: Vec<_> = spec.block("color").iter().filter_map(|f| f.scope()).collect();
    assert_eq!(color_scopes, ["water", "rivers"]);
    assert_eq!(spec.block("position").len(), 1);

    // Uniform forwarded from water, overridable per style.
    assert_eq!(registry.uniform("rivers", "u_wave_height"), Some(&json!(0.4)));
    registry.set_uniform("rivers", "u_wave_height", json!(0.9));
    assert_eq!(registry.uniform("rivers", "u_wave_height"), Some(&json!(0.9)));
    assert_eq!(registry.uniform("water", "u_wave_height"), Some(&json!(0.4)));

    // Every active style was initialized exactly once.
    let mut expected: Vec<&str> =
        vec!["hills", "lines", "points", "polygons", "rivers", "text", "water"];
    expected.sort();
    let mut initialized = pipeline.initialized.clone();
    initialized.sort();
    assert_eq!(initialized, expected);
}

#[test]
fn test_diamond_inheritance_counts_once() {
    let declarations = decls(
        r#"
        effects:
          shaders:
            blocks:
              global: "float pulse(float t) { return sin(t); }"
        fill:
          mix: effects
        outline:
          mix: effects
        landmarks:
          base: polygons
          mix: [fill, outline]
        "#,
    );

    let mut registry = registry();
    registry
        .rebuild(&declarations, &mut RecordingPipeline::new())
        .unwrap();

    let landmarks = registry.get("landmarks").unwrap();
    let spec = landmarks.def.shaders.as_ref().unwrap();
    assert_eq!(
        spec.block("global").len(),
        1,
        "effects reachable through two paths contributes once"
    );

    let mixed = landmarks.def.mixed_from.as_ref().unwrap();
    assert_eq!(mixed.iter().collect::<Vec<_>>(), ["effects", "fill", "outline"]);
}

#[test]
fn test_dependency_order_is_input_order_independent() {
    // Same declarations, three textual orders; all must produce the same
    // composed output.
    let variants = [
        r#"
        c: { mix: b, base: polygons }
        b: { mix: a }
        a: { shaders: { defines: { DEPTH: 1 } } }
        "#,
        r#"
        a: { shaders: { defines: { DEPTH: 1 } } }
        b: { mix: a }
        c: { mix: b, base: polygons }
        "#,
        r#"
        b: { mix: a }
        c: { mix: b, base: polygons }
        a: { shaders: { defines: { DEPTH: 1 } } }
        "#,
    ];

    for yaml in variants {
        let mut registry = registry();
        registry
            .rebuild(&decls(yaml), &mut RecordingPipeline::new())
            .unwrap();
        let c = registry.get("c").unwrap();
        assert_eq!(c.def.shaders.as_ref().unwrap().defines["DEPTH"], json!(1));
        assert_eq!(
            c.def.mixed_from.as_ref().unwrap().iter().collect::<Vec<_>>(),
            ["a", "b"]
        );
    }
}

#[test]
fn test_cycles_and_self_mixes_terminate() {
    let declarations = decls(
        r#"
        ouroboros: { mix: ouroboros, base: polygons }
        ping: { mix: pong, base: polygons }
        pong: { mix: ping }
        "#,
    );

    let mut registry = registry();
    registry
        .rebuild(&declarations, &mut RecordingPipeline::new())
        .unwrap();

    // All three styles still built; bad edges were pruned.
    assert!(registry.get("ouroboros").is_some());
    assert!(registry.get("ping").is_some());

    let errors: Vec<_> = registry.diagnostics().iter().collect();
    assert!(errors
        .iter()
        .any(|d| matches!(d.error, StyleError::CyclicAncestry { .. })));
    assert!(errors
        .iter()
        .any(|d| matches!(d.error, StyleError::SelfMix { .. }) && d.style == "ouroboros"));
}

#[test]
fn test_missing_ancestor_warns_and_continues() {
    let declarations = decls(
        r#"
        orphan: { base: polygons, mix: ghost, animated: true }
        "#,
    );

    let mut registry = registry();
    registry
        .rebuild(&declarations, &mut RecordingPipeline::new())
        .unwrap();

    let orphan = registry.get("orphan").unwrap();
    assert!(orphan.def.animated);
    let diagnostic = &registry.diagnostics()[0];
    assert_eq!(diagnostic.severity, Severity::Warning);
    assert_eq!(
        diagnostic.message(),
        "style 'orphan' mixes unknown style 'ghost'"
    );
}

#[test]
fn test_compile_failure_flags_single_style() {
    let declarations = decls(
        r#"
        good: { base: polygons }
        broken: { base: polygons, shaders: { blocks: { color: "nonsense" } } }
        "#,
    );

    let mut registry = registry();
    let mut pipeline = RecordingPipeline::new();
    pipeline.fail_compile.push("broken".to_string());

    registry.rebuild(&declarations, &mut pipeline).unwrap();
    registry.compile(&mut pipeline);

    assert!(registry.get("good").unwrap().renderable());
    assert!(pipeline.compiled.contains(&"good".to_string()));
    assert!(!registry.get("broken").unwrap().renderable());
    assert!(registry.get("broken").is_some(), "stays active");

    let compile_diag = registry
        .diagnostics()
        .iter()
        .find(|d| matches!(d.error, StyleError::Compile { .. }))
        .unwrap();
    assert_eq!(compile_diag.style, "broken");
    assert!(compile_diag.message().contains("undeclared identifier"));
}

#[test]
fn test_rebuild_twice_is_stable() {
    let declarations = decls(
        r#"
        water: { base: polygons, shaders: { blocks: { color: "c" } } }
        deep-water: { mix: water, lighting: vertex }
        "#,
    );

    let mut registry = registry();
    registry
        .rebuild(&declarations, &mut RecordingPipeline::new())
        .unwrap();
    let first = registry.get("water").unwrap().def.clone();

    registry
        .rebuild(&declarations, &mut RecordingPipeline::new())
        .unwrap();
    let second = registry.get("water").unwrap().def.clone();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_prefetch_then_rebuild() {
    let mut remote = HashMap::new();
    remote.insert(
        "https://styles.example.com/effects.yaml".to_string(),
        r#"
        dither-base:
          shaders:
            defines: { DITHER_LEVELS: 4 }
        dither:
          mix: dither-base
          shaders:
            blocks:
              filter:
                - url: /shaders/dither.glsl
        "#
        .to_string(),
    );
    remote.insert(
        "https://styles.example.com/shaders/dither.glsl".to_string(),
        "color.rgb = dither(color.rgb, gl_FragCoord.xy);".to_string(),
    );
    let fetcher: Arc<dyn FetchText> = Arc::new(MapFetcher(remote));

    let mut declarations = decls(
        r#"
        halftone:
          url: effects.yaml
          name: dither
        newsprint:
          base: polygons
          mix: halftone
        "#,
    );

    let base = Some("https://styles.example.com/scene.yaml");
    let mut diagnostics = Vec::new();
    load_remote_styles(&mut declarations, Arc::clone(&fetcher), base, &mut diagnostics).await;
    load_shader_blocks(&mut declarations, fetcher, base, &mut diagnostics).await;
    assert!(diagnostics.is_empty());

    let mut registry = registry();
    registry
        .rebuild(&declarations, &mut RecordingPipeline::new())
        .unwrap();

    let newsprint = registry.get("newsprint").unwrap();
    let spec = newsprint.def.shaders.as_ref().unwrap();
    assert_eq!(spec.defines["DITHER_LEVELS"], json!(4));
    assert_eq!(
        spec.block("filter")[0].source(),
        Some("color.rgb = dither(color.rgb, gl_FragCoord.xy);")
    );
    // The remote style's own ancestry carried through the import.
    assert!(newsprint
        .def
        .mixed_from
        .as_ref()
        .unwrap()
        .contains("halftone"));
}

#[tokio::test]
async fn test_failed_remote_import_drops_dependents_only() {
    let fetcher: Arc<dyn FetchText> = Arc::new(MapFetcher(HashMap::new()));
    let mut declarations = decls(
        r#"
        missing-remote: { url: "https://styles.example.com/gone.yaml" }
        local: { base: polygons }
        "#,
    );

    let mut diagnostics = Vec::new();
    load_remote_styles(&mut declarations, fetcher, None, &mut diagnostics).await;

    let mut registry = registry();
    registry
        .rebuild(&declarations, &mut RecordingPipeline::new())
        .unwrap();

    assert!(registry.get("missing-remote").is_none());
    assert!(registry.get("local").is_some());
    assert!(matches!(diagnostics[0].error, StyleError::Fetch { .. }));
}
