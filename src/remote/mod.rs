//! Remote style and shader-block prefetch.
//!
//! Two prefetch phases run before a rebuild and must fully settle before
//! composition starts:
//!
//! - [`load_remote_styles`] resolves declarations that import styles from
//!   external documents;
//! - [`load_shader_blocks`] substitutes `{ url }` block fragments with their
//!   fetched source text — it runs second, so fragments that arrived inside
//!   a remote document are substituted too.
//!
//! Within each phase every fetch runs concurrently.
//!
//! Both isolate failures per target: a fetch that fails drops only the
//! styles or fragments that needed it, records a diagnostic, and leaves the
//! rest of the batch untouched. Network transport itself is the caller's
//! concern, supplied as a [`FetchText`] implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::error::{Diagnostic, FetchFailure, StyleError};
use crate::style::{build_order, compose, StyleDef, WorkingSet};

/// Text-fetching capability supplied by the network collaborator.
///
/// Implementations decide transport, caching, and timeouts; the engine only
/// needs the text or a failure it can report.
#[async_trait]
pub trait FetchText: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchFailure>;
}

/// One style import requested from a remote document.
#[derive(Debug, Clone)]
struct Import {
    /// Local name the imported style will be registered under.
    target: String,
    /// Name of the style inside the remote document.
    source: String,
}

/// Resolves remote style imports in place.
///
/// Imports are grouped by URL so a document serving several styles is
/// fetched once. Each fetched document is parsed, its own mixins are
/// resolved within the document, and the requested styles are spliced back
/// into the batch under their local names. A failed fetch, an unparsable
/// document, or a missing source style drops only the importing styles,
/// each with a diagnostic naming the style and URL.
pub async fn load_remote_styles(
    styles: &mut HashMap<String, StyleDef>,
    fetcher: Arc<dyn FetchText>,
    base: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut urls: HashMap<String, Vec<Import>> = HashMap::new();
    for (name, style) in styles.iter() {
        if let Some(url) = &style.url {
            let url = join_url(url, base);
            urls.entry(url).or_default().push(Import {
                target: name.clone(),
                source: style.source_name.clone().unwrap_or_else(|| name.clone()),
            });
        }
    }
    if urls.is_empty() {
        return;
    }

    let mut fetches = JoinSet::new();
    for (url, imports) in urls {
        let fetcher = Arc::clone(&fetcher);
        fetches.spawn(async move {
            let result = fetcher.fetch_text(&url).await;
            (url, imports, result)
        });
    }

    while let Some(joined) = fetches.join_next().await {
        let Ok((url, imports, result)) = joined else {
            log::error!("remote style fetch task failed to join");
            continue;
        };
        match result {
            Ok(text) => splice_remote_document(styles, &url, &imports, &text, diagnostics),
            Err(failure) => {
                log::error!("error importing styles from '{url}': {failure}");
                for import in &imports {
                    styles.remove(&import.target);
                    diagnostics.push(Diagnostic::error(
                        &import.target,
                        StyleError::Fetch {
                            style: import.target.clone(),
                            url: url.clone(),
                            message: failure.message.clone(),
                        },
                    ));
                }
            }
        }
    }
}

/// Parses a fetched document, premixes it, and splices the imports.
fn splice_remote_document(
    styles: &mut HashMap<String, StyleDef>,
    url: &str,
    imports: &[Import],
    text: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut document: HashMap<String, StyleDef> = match serde_yaml::from_str(text) {
        Ok(document) => document,
        Err(parse_error) => {
            log::error!("error parsing remote style document '{url}': {parse_error}");
            for import in imports {
                styles.remove(&import.target);
                diagnostics.push(Diagnostic::error(
                    &import.target,
                    StyleError::Fetch {
                        style: import.target.clone(),
                        url: url.to_string(),
                        message: parse_error.to_string(),
                    },
                ));
            }
            return;
        }
    };

    // Imported styles take their requested local name; the rest keep their
    // in-document name. Block provenance recorded during the premix below
    // then carries the names the local batch will see.
    for (source_name, def) in document.iter_mut() {
        def.name = imports
            .iter()
            .find(|import| &import.source == source_name)
            .map(|import| import.target.clone())
            .unwrap_or_else(|| source_name.clone());
    }

    // Resolve mixins within the remote document before splicing, so every
    // import arrives fully merged.
    let order = build_order(&document, diagnostics);
    let mut working = WorkingSet::new();
    for key in &order {
        let Some(def) = document.get(key) else {
            continue;
        };
        let merged = compose(def, &working, diagnostics);
        working.insert(key.clone(), merged);
    }

    for import in imports {
        match working.get(&import.source) {
            Some(def) => {
                // The same source style may satisfy several imports; each
                // splice gets its own copy under its local name.
                let mut def = def.clone();
                def.name = import.target.clone();
                styles.insert(import.target.clone(), def);
            }
            None => {
                log::error!(
                    "could not find style '{}' in remote document '{url}'",
                    import.source
                );
                styles.remove(&import.target);
                diagnostics.push(Diagnostic::error(
                    &import.target,
                    StyleError::MissingImport {
                        style: import.target.clone(),
                        url: url.to_string(),
                    },
                ));
            }
        }
    }
}

/// Substitutes remote shader-block references with their fetched text.
///
/// Fragments that fail to fetch are removed from their slot with a
/// diagnostic; the style itself stays in the batch.
pub async fn load_shader_blocks(
    styles: &mut HashMap<String, StyleDef>,
    fetcher: Arc<dyn FetchText>,
    base: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut fetches = JoinSet::new();
    for (name, style) in styles.iter() {
        let Some(shaders) = &style.shaders else {
            continue;
        };
        for (slot, fragments) in &shaders.blocks {
            for (index, fragment) in fragments.iter().enumerate() {
                if let Some(url) = fragment.url() {
                    let url = join_url(url, base);
                    let key = (name.clone(), slot.clone(), index);
                    let fetcher = Arc::clone(&fetcher);
                    fetches.spawn(async move {
                        let result = fetcher.fetch_text(&url).await;
                        (key, url, result)
                    });
                }
            }
        }
    }

    // Failed fragments are dropped after all substitutions land, highest
    // index first, so pending indices stay valid.
    let mut failed: Vec<(String, String, usize)> = Vec::new();
    while let Some(joined) = fetches.join_next().await {
        let Ok(((name, slot, index), url, result)) = joined else {
            log::error!("shader block fetch task failed to join");
            continue;
        };
        match result {
            Ok(text) => {
                if let Some(fragment) = styles
                    .get_mut(&name)
                    .and_then(|style| style.shaders.as_mut())
                    .and_then(|shaders| shaders.blocks.get_mut(&slot))
                    .and_then(|fragments| fragments.get_mut(index))
                {
                    // Keeps the provenance tag when the style arrived
                    // premixed from a remote document.
                    fragment.resolve(text);
                }
            }
            Err(failure) => {
                log::error!("error loading shader block '{url}' for style '{name}': {failure}");
                diagnostics.push(Diagnostic::error(
                    &name,
                    StyleError::Fetch {
                        style: name.clone(),
                        url,
                        message: failure.message,
                    },
                ));
                failed.push((name, slot, index));
            }
        }
    }

    failed.sort_by(|a, b| b.2.cmp(&a.2));
    for (name, slot, index) in failed {
        if let Some(fragments) = styles
            .get_mut(&name)
            .and_then(|style| style.shaders.as_mut())
            .and_then(|shaders| shaders.blocks.get_mut(&slot))
        {
            if index < fragments.len() {
                fragments.remove(index);
            }
        }
    }
}

/// Resolves a possibly-relative URL against the base document's URL.
///
/// Scheme-prefixed and protocol-relative URLs pass through untouched.
/// Host-absolute paths keep the base origin; anything else resolves against
/// the base document's directory.
pub(crate) fn join_url(url: &str, base: Option<&str>) -> String {
    let Some(base) = base else {
        return url.to_string();
    };
    if url.starts_with("//")
        || ["http:", "https:", "data:", "blob:"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
    {
        return url.to_string();
    }

    if let Some(path) = url.strip_prefix('/') {
        format!("{}/{}", origin(base), path)
    } else {
        format!("{}{}", directory(base), url)
    }
}

/// `scheme://host` portion of a URL.
fn origin(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return url;
    };
    let host_start = scheme_end + 3;
    match url[host_start..].find('/') {
        Some(slash) => &url[..host_start + slash],
        None => url,
    }
}

/// Everything up to and including the last `/` of a URL's path.
fn directory(url: &str) -> String {
    let path_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[path_start..].rfind('/') {
        Some(slash) => url[..path_start + slash + 1].to_string(),
        None => format!("{url}/"),
    }
}
