//! Shader specifications contributed by styles.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::uniforms::UniformTable;

/// Capability-extension names: a single name or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extensions {
    Single(String),
    List(Vec<String>),
}

impl Extensions {
    pub fn names(&self) -> &[String] {
        match self {
            Extensions::Single(name) => std::slice::from_ref(name),
            Extensions::List(names) => names,
        }
    }
}

/// A block fragment's payload: source text, or a reference resolved during
/// prefetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentBody {
    Inline(String),
    Remote { url: String },
}

/// One source fragment within a block slot.
///
/// Scene files author fragments either inline or as a `{ url }` reference
/// substituted during prefetch. Composition attributes every fragment to the
/// style that contributed it; that scope tag is what collapses diamond
/// inheritance and survives further mixing untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFragment", into = "RawFragment")]
pub struct BlockFragment {
    body: FragmentBody,
    scope: Option<String>,
}

impl BlockFragment {
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            body: FragmentBody::Inline(source.into()),
            scope: None,
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            body: FragmentBody::Remote { url: url.into() },
            scope: None,
        }
    }

    pub fn tagged(source: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            body: FragmentBody::Inline(source.into()),
            scope: Some(scope.into()),
        }
    }

    /// The fragment's source text; `None` for an unresolved remote reference.
    pub fn source(&self) -> Option<&str> {
        match &self.body {
            FragmentBody::Inline(source) => Some(source),
            FragmentBody::Remote { .. } => None,
        }
    }

    /// The unresolved reference, when the fragment has not been fetched yet.
    pub fn url(&self) -> Option<&str> {
        match &self.body {
            FragmentBody::Remote { url } => Some(url),
            FragmentBody::Inline(_) => None,
        }
    }

    /// The contributing style's name, once attributed by composition.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Re-attributes the fragment to the given style.
    pub(crate) fn rescoped(&self, scope: impl Into<String>) -> Self {
        Self {
            body: self.body.clone(),
            scope: Some(scope.into()),
        }
    }

    /// Replaces the payload with fetched source text, keeping the scope.
    pub(crate) fn resolve(&mut self, source: String) {
        self.body = FragmentBody::Inline(source);
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawFragment {
    Inline(String),
    Remote { url: String },
    Tagged { source: String, scope: String },
}

impl From<RawFragment> for BlockFragment {
    fn from(raw: RawFragment) -> Self {
        match raw {
            RawFragment::Inline(source) => BlockFragment::inline(source),
            RawFragment::Remote { url } => BlockFragment::remote(url),
            RawFragment::Tagged { source, scope } => BlockFragment::tagged(source, scope),
        }
    }
}

impl From<BlockFragment> for RawFragment {
    fn from(fragment: BlockFragment) -> Self {
        match (fragment.body, fragment.scope) {
            (FragmentBody::Inline(source), Some(scope)) => RawFragment::Tagged { source, scope },
            (FragmentBody::Inline(source), None) => RawFragment::Inline(source),
            (FragmentBody::Remote { url }, _) => RawFragment::Remote { url },
        }
    }
}

/// A style's shader contribution.
///
/// Before composition this is exactly what the scene author wrote; after
/// composition, `defines`/`extensions`/`blocks` hold the merged chain and
/// `uniforms` is a forwarding table (see [`UniformTable`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSpec {
    /// Shader preprocessor defines.
    pub defines: HashMap<String, Value>,

    /// Uniform values; only values authored on this style serialize.
    pub uniforms: UniformTable,

    /// Required capability extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,

    /// Source fragments per named slot. A slot accepts a single fragment or
    /// a list; both normalize to a list.
    #[serde(deserialize_with = "blocks_one_or_many")]
    pub blocks: HashMap<String, Vec<BlockFragment>>,
}

impl ShaderSpec {
    /// Merged extension names; empty when no chain member required any.
    pub fn extension_names(&self) -> &[String] {
        self.extensions.as_ref().map(Extensions::names).unwrap_or(&[])
    }

    /// Fragments for one slot, in merge order.
    pub fn block(&self, slot: &str) -> &[BlockFragment] {
        self.blocks.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn blocks_one_or_many<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, Vec<BlockFragment>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(BlockFragment),
        Many(Vec<BlockFragment>),
    }

    let raw: HashMap<String, OneOrMany> = HashMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(slot, entry)| {
            let fragments = match entry {
                OneOrMany::One(fragment) => vec![fragment],
                OneOrMany::Many(fragments) => fragments,
            };
            (slot, fragments)
        })
        .collect())
}
