//! Flat `key=value` overrides, typically from `-D` command-line flags.

use super::node::{ConfigNode, Scalar};
use super::path::PropertyPath;
use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct OverrideEntry {
    key: String,
    segments: Vec<String>,
    value: String,
}

/// Ordered override definitions.
///
/// Entries keep the order they were given in. When the set is turned into
/// a source, a key defined more than once takes its most recent value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    entries: Vec<OverrideEntry>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` definitions in order.
    pub fn from_definitions<I, S>(definitions: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for definition in definitions {
            let (key, value) = Self::parse_definition(definition.as_ref())?;
            overrides.insert(key, value)?;
        }
        Ok(overrides)
    }

    /// Split a `key=value` definition at the first `=`.
    pub fn parse_definition(definition: &str) -> ConfigResult<(String, String)> {
        let Some((key, value)) = definition.split_once('=') else {
            return Err(ConfigError::InvalidOverride {
                definition: definition.to_string(),
                reason: "expected key=value".to_string(),
            });
        };
        Ok((key.trim().to_string(), value.to_string()))
    }

    /// Append one definition.
    ///
    /// The key is a plain dotted path; index selectors are rejected.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> ConfigResult<()> {
        let key = key.into();
        let value = value.into();
        let invalid = |reason: String| ConfigError::InvalidOverride {
            definition: format!("{}={}", key, value),
            reason,
        };

        let path = PropertyPath::parse(&key).map_err(|e| invalid(e.to_string()))?;
        if path.has_index() {
            return Err(invalid("index selectors are not allowed in override keys".into()));
        }
        let segments = path.segments().iter().map(|s| s.name.clone()).collect();
        self.entries.push(OverrideEntry {
            key,
            segments,
            value,
        });
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> ConfigResult<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Definitions in the order they were given.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the tree of the override source.
    pub fn to_node(&self) -> ConfigNode {
        let mut root = ConfigNode::root();
        for entry in &self.entries {
            root.set_path(&entry.segments, Scalar::String(entry.value.clone()));
        }
        root
    }
}
