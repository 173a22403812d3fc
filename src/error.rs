//! Error taxonomy and diagnostic events.
//!
//! Composition is batch-oriented: a problem with one style prunes that style
//! (or the bad edge) and the rest of the batch proceeds. Per-style problems
//! are therefore reported as [`Diagnostic`] events accumulated during a
//! rebuild, while [`StyleError`] doubles as the typed payload of those events
//! and as the return type for the few failures that abort a batch outright.

use thiserror::Error;

/// Errors raised while composing styles or rebuilding the registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    /// A style mixes a name absent from the declaration set.
    #[error("style '{style}' mixes unknown style '{missing}'")]
    MissingAncestor { style: String, missing: String },

    /// A style lists itself as its own ancestor, directly or transitively.
    #[error("style '{style}' cannot mix itself")]
    SelfMix { style: String },

    /// Mixin references form a cycle; the re-entrant edge is dropped.
    #[error("cyclic ancestry: {}", path.join(" -> "))]
    CyclicAncestry { path: Vec<String> },

    /// A remote style document or shader block could not be loaded.
    #[error("style '{style}' failed to import from '{url}': {message}")]
    Fetch {
        style: String,
        url: String,
        message: String,
    },

    /// A remote document loaded, but did not contain the requested style.
    #[error("style '{style}' not found in remote document '{url}'")]
    MissingImport { style: String, url: String },

    /// Program assembly failed downstream for a composed style.
    #[error("style '{style}' failed to compile: {}", diagnostics.join("; "))]
    Compile {
        style: String,
        diagnostics: Vec<String>,
    },

    /// The declaration set itself is unusable; nothing was built.
    #[error("malformed style batch: {reason}")]
    MalformedBatch { reason: String },
}

/// Failure reported by a [`FetchText`](crate::remote::FetchText)
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchFailure {
    pub message: String,
}

impl FetchFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Diagnostic severity.
///
/// Warnings cover configuration issues the engine repairs on its own
/// (a pruned edge, a dropped import); errors cover problems that cost a
/// style its render output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A per-style problem observed during a rebuild.
///
/// Diagnostics never abort the batch; the rendering pipeline inspects them
/// after a rebuild and decides whether to degrade gracefully or bail.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Name of the offending style.
    pub style: String,
    pub error: StyleError,
}

impl Diagnostic {
    pub fn warning(style: impl Into<String>, error: StyleError) -> Self {
        Self {
            severity: Severity::Warning,
            style: style.into(),
            error,
        }
    }

    pub fn error(style: impl Into<String>, error: StyleError) -> Self {
        Self {
            severity: Severity::Error,
            style: style.into(),
            error,
        }
    }

    /// Human-readable message for this diagnostic.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}
