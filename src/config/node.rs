//! Immutable configuration tree.
//!
//! Every configuration source is turned into one [`ConfigNode`] tree by a
//! format loader. Children sharing a name are siblings of a repeated group
//! and keep their source order; a leaf may carry several values (a repeated
//! key or a list of scalars).

use serde::Serialize;
use std::fmt;

/// A raw scalar as reported by a source format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A node of a configuration tree.
///
/// Trees are assembled by loaders with the consuming `with_*` methods and
/// are read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigNode {
    name: String,
    values: Vec<Scalar>,
    children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// Create an empty root node.
    pub fn root() -> Self {
        Self::default()
    }

    /// Create an empty node with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a leaf carrying the given values.
    pub fn leaf<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            children: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Scalar>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ConfigNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    /// Children with the given name, in source order.
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a ConfigNode> + use<'a, 'n> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// The `index`-th sibling named `name`.
    pub fn child(&self, name: &str, index: usize) -> Option<&ConfigNode> {
        self.children_named(name).nth(index)
    }

    /// Whether this node carries a value or a subtree.
    ///
    /// Nodes without either (a YAML `key:` with no value) count as absent.
    pub fn is_defined(&self) -> bool {
        !self.values.is_empty() || !self.children.is_empty()
    }

    /// Paths of every node carrying values below this one.
    ///
    /// Members of repeated groups get an index selector (`dep[1].id`).
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_leaf_paths("", &mut paths);
        paths
    }

    fn collect_leaf_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let mut seen: Vec<&str> = Vec::new();
        for child in &self.children {
            if seen.contains(&child.name.as_str()) {
                continue;
            }
            seen.push(&child.name);

            let group: Vec<&ConfigNode> = self.children_named(&child.name).collect();
            for (index, member) in group.iter().enumerate() {
                let segment = if group.len() > 1 {
                    format!("{}[{}]", member.name, index)
                } else {
                    member.name.clone()
                };
                let path = if prefix.is_empty() {
                    segment
                } else {
                    format!("{}.{}", prefix, segment)
                };
                if !member.values.is_empty() {
                    out.push(path.clone());
                }
                member.collect_leaf_paths(&path, out);
            }
        }
    }

    /// Replace the values at `segments`, creating intermediate nodes.
    pub(crate) fn set_path(&mut self, segments: &[String], value: Scalar) {
        let node = self.descend_or_create(segments);
        node.values = vec![value];
    }

    /// Append a value at `segments`, creating intermediate nodes.
    pub(crate) fn push_path(&mut self, segments: &[String], value: Scalar) {
        let node = self.descend_or_create(segments);
        node.values.push(value);
    }

    pub(crate) fn push_child(&mut self, child: ConfigNode) {
        self.children.push(child);
    }

    pub(crate) fn push_value(&mut self, value: Scalar) {
        self.values.push(value);
    }

    fn descend_or_create(&mut self, segments: &[String]) -> &mut ConfigNode {
        match segments.split_first() {
            None => self,
            Some((head, rest)) => {
                let index = match self.children.iter().position(|c| &c.name == head) {
                    Some(index) => index,
                    None => {
                        self.children.push(ConfigNode::new(head.clone()));
                        self.children.len() - 1
                    }
                };
                self.children[index].descend_or_create(rest)
            }
        }
    }
}
