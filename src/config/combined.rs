//! The merged, read-only view over all configuration sources.

use super::node::{ConfigNode, Scalar};
use super::path::{Locator, PropertyPath, Resolution, resolve};
use serde::Serialize;
use std::collections::HashSet;

/// Where a source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    /// A loaded file or a tree supplied by the caller.
    File,
    /// The synthetic source built from `key=value` definitions.
    Overrides,
}

impl std::fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceOrigin::File => write!(f, "file"),
            SourceOrigin::Overrides => write!(f, "overrides"),
        }
    }
}

/// One layer of the combined configuration.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    label: String,
    origin: SourceOrigin,
    root: ConfigNode,
}

impl ConfigSource {
    pub fn new(label: impl Into<String>, origin: SourceOrigin, root: ConfigNode) -> Self {
        Self {
            label: label.into(),
            origin,
            root,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn origin(&self) -> SourceOrigin {
        self.origin
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }
}

/// A resolved leaf, as listed by [`CombinedConfig::entries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntry {
    pub path: String,
    pub source: String,
    pub values: Vec<Scalar>,
}

/// Sources ordered from lowest to highest priority.
#[derive(Debug, Clone, Default)]
pub struct CombinedConfig {
    sources: Vec<ConfigSource>,
}

impl CombinedConfig {
    pub(crate) fn from_sources(sources: Vec<ConfigSource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn source(&self, index: usize) -> Option<&ConfigSource> {
        self.sources.get(index)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolve a path from the root. Malformed paths are not found.
    pub fn lookup(&self, path: &str) -> Resolution<'_> {
        match PropertyPath::parse(path) {
            Ok(parsed) => resolve(&parsed, &Locator::root(), self),
            Err(_) => Resolution::NotFound,
        }
    }

    /// Every value at `path`, taken from the winning source.
    pub fn values(&self, path: &str) -> Vec<&Scalar> {
        self.lookup(path)
            .matches()
            .iter()
            .flat_map(|m| m.node.values())
            .collect()
    }

    /// Every leaf path defined by any source, with its effective values.
    ///
    /// Paths are listed in first-seen order, scanning sources from lowest
    /// to highest priority.
    pub fn entries(&self) -> Vec<ResolvedEntry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for source in &self.sources {
            for path in source.root.leaf_paths() {
                if !seen.insert(path.clone()) {
                    continue;
                }
                let resolution = self.lookup(&path);
                let Some(winner) = resolution.source().and_then(|i| self.source(i)) else {
                    continue;
                };
                entries.push(ResolvedEntry {
                    source: winner.label.clone(),
                    values: resolution
                        .matches()
                        .iter()
                        .flat_map(|m| m.node.values().iter().cloned())
                        .collect(),
                    path,
                });
            }
        }
        entries
    }
}
