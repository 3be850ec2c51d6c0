//! Source loading.
//!
//! YAML, JSON and TOML are parsed into a `serde_json::Value` first and then
//! converted into a [`ConfigNode`] tree, so they share one mapping:
//!
//! - a mapping becomes a node with one child per key;
//! - a list of scalars becomes one leaf holding every value;
//! - a list of mappings becomes repeated sibling nodes;
//! - `null` is treated as absent.
//!
//! XML, INI and `.properties` files are read into a tree directly. In XML
//! the document element is the root, repeated elements become repeated
//! siblings and attributes become child leaves. An INI section is a child
//! of the root.

use super::combined::CombinedConfig;
use super::merge::merge;
use super::node::{ConfigNode, Scalar};
use super::overrides::Overrides;
use crate::error::{ConfigError, ConfigResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File formats with a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Json,
    Toml,
    Xml,
    Ini,
    Properties,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Yaml => write!(f, "yaml"),
            SourceFormat::Json => write!(f, "json"),
            SourceFormat::Toml => write!(f, "toml"),
            SourceFormat::Xml => write!(f, "xml"),
            SourceFormat::Ini => write!(f, "ini"),
            SourceFormat::Properties => write!(f, "properties"),
        }
    }
}

impl SourceFormat {
    /// Match a file extension, ignoring case.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            "json" => Some(SourceFormat::Json),
            "toml" => Some(SourceFormat::Toml),
            "xml" => Some(SourceFormat::Xml),
            "ini" => Some(SourceFormat::Ini),
            "properties" => Some(SourceFormat::Properties),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension).ok_or_else(|| ConfigError::UnsupportedSourceFormat {
            path: path.to_path_buf(),
            extension: extension.to_string(),
        })
    }
}

/// Parse source text into a tree.
pub fn parse_source(text: &str, format: SourceFormat, label: &str) -> ConfigResult<ConfigNode> {
    let value = match format {
        SourceFormat::Yaml => serde_yaml::from_str::<Value>(text)
            .map_err(|e| ConfigError::load_failed(label, format!("YAML parse error: {}", e)))?,
        SourceFormat::Json => serde_json::from_str::<Value>(text)
            .map_err(|e| ConfigError::load_failed(label, format!("JSON parse error: {}", e)))?,
        SourceFormat::Toml => {
            let table: toml::Value = toml::from_str(text)
                .map_err(|e| ConfigError::load_failed(label, format!("TOML parse error: {}", e)))?;
            toml_to_json(table)
        }
        SourceFormat::Xml => return parse_xml(text, label),
        SourceFormat::Ini => return parse_ini(text, label),
        SourceFormat::Properties => return parse_properties(text, label),
    };
    value_to_node(value, label)
}

/// Read and parse one file. The format follows the extension.
pub fn load_source(path: &Path) -> ConfigResult<ConfigNode> {
    let format = SourceFormat::from_path(path)?;
    let label = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::load_failed(&label, e))?;
    let root = parse_source(&text, format, &label)?;
    debug!(
        path = %label,
        %format,
        keys = root.leaf_paths().len(),
        "Loaded configuration source"
    );
    Ok(root)
}

fn value_to_node(value: Value, label: &str) -> ConfigResult<ConfigNode> {
    match value {
        Value::Object(map) => {
            let mut root = ConfigNode::root();
            for (key, value) in map {
                append(&mut root, &key, value);
            }
            Ok(root)
        }
        // An empty document
        Value::Null => Ok(ConfigNode::root()),
        _ => Err(ConfigError::load_failed(label, "top level must be a mapping")),
    }
}

fn append(parent: &mut ConfigNode, key: &str, value: Value) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            let mut node = ConfigNode::new(key);
            for (child_key, child_value) in map {
                append(&mut node, &child_key, child_value);
            }
            parent.push_child(node);
        }
        Value::Array(items) => {
            let mut leaf = ConfigNode::new(key);
            let mut groups = Vec::new();
            collect_elements(items, key, &mut leaf, &mut groups);
            if leaf.is_defined() {
                parent.push_child(leaf);
            }
            for group in groups {
                parent.push_child(group);
            }
        }
        scalar => {
            if let Some(scalar) = to_scalar(scalar) {
                parent.push_child(ConfigNode::leaf(key, [scalar]));
            }
        }
    }
}

fn collect_elements(
    items: Vec<Value>,
    key: &str,
    leaf: &mut ConfigNode,
    groups: &mut Vec<ConfigNode>,
) {
    for item in items {
        match item {
            Value::Null => {}
            Value::Object(map) => {
                let mut group = ConfigNode::new(key);
                for (child_key, child_value) in map {
                    append(&mut group, &child_key, child_value);
                }
                groups.push(group);
            }
            Value::Array(inner) => collect_elements(inner, key, leaf, groups),
            scalar => {
                if let Some(scalar) = to_scalar(scalar) {
                    leaf.push_value(scalar);
                }
            }
        }
    }
}

fn to_scalar(value: Value) -> Option<Scalar> {
    match value {
        Value::Bool(b) => Some(Scalar::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Scalar::Integer(i)),
            None => n.as_f64().map(Scalar::Float),
        },
        Value::String(s) => Some(Scalar::String(s)),
        _ => None,
    }
}

/// Convert a TOML value into a JSON value.
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            Value::Object(map)
        }
    }
}

fn parse_xml(text: &str, label: &str) -> ConfigResult<ConfigNode> {
    let failed =
        |reason: String| ConfigError::load_failed(label, format!("XML parse error: {}", reason));
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut open: Vec<ConfigNode> = Vec::new();
    let mut document: Option<ConfigNode> = None;
    loop {
        let event = reader.read_event().map_err(|e| failed(e.to_string()))?;
        let closed = match event {
            Event::Start(start) => {
                open.push(xml_element(&start).map_err(failed)?);
                None
            }
            Event::Empty(start) => Some(xml_element(&start).map_err(failed)?),
            Event::End(_) => open.pop(),
            Event::Text(content) => {
                let value = content.unescape().map_err(|e| failed(e.to_string()))?;
                if let Some(node) = open.last_mut().filter(|_| !value.is_empty()) {
                    node.push_value(Scalar::String(value.into_owned()));
                }
                None
            }
            Event::CData(content) => {
                let value = String::from_utf8_lossy(&content.into_inner()).into_owned();
                if let Some(node) = open.last_mut() {
                    node.push_value(Scalar::String(value));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        let Some(node) = closed else {
            continue;
        };
        match open.last_mut() {
            Some(parent) => parent.push_child(node),
            None if document.is_none() => document = Some(node),
            None => return Err(failed("more than one document element".into())),
        }
    }

    if !open.is_empty() {
        return Err(failed("unexpected end of document".into()));
    }
    let document = document.ok_or_else(|| failed("no document element".into()))?;
    Ok(ConfigNode::root().with_children(document.children().iter().cloned()))
}

/// An element node carrying its attributes as child leaves.
fn xml_element(start: &BytesStart<'_>) -> Result<ConfigNode, String> {
    let mut node = ConfigNode::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(|e| e.to_string())?;
        node.push_child(ConfigNode::leaf(name, [value.into_owned()]));
    }
    Ok(node)
}

/// Parse an INI file. Keys outside any section sit at the root.
fn parse_ini(text: &str, label: &str) -> ConfigResult<ConfigNode> {
    let ini = ini::Ini::load_from_str(text)
        .map_err(|e| ConfigError::load_failed(label, format!("INI parse error: {}", e)))?;

    let mut root = ConfigNode::root();
    for (section, properties) in ini.iter() {
        for (key, value) in properties.iter() {
            let segments: Vec<String> = section
                .into_iter()
                .chain(key.split('.'))
                .map(str::to_string)
                .collect();
            if segments.iter().any(String::is_empty) {
                return Err(ConfigError::load_failed(label, format!("invalid key '{}'", key)));
            }
            root.push_path(&segments, Scalar::String(value.to_string()));
        }
    }
    Ok(root)
}

/// Parse a `.properties` file.
///
/// Keys are dotted paths. A key given more than once collects every value
/// in file order.
fn parse_properties(text: &str, label: &str) -> ConfigResult<ConfigNode> {
    let mut root = ConfigNode::root();
    let mut lines = text.lines().enumerate();

    while let Some((number, line)) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_property(&logical);
        let segments: Vec<String> = key.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ConfigError::load_failed(
                label,
                format!("line {}: invalid key '{}'", number + 1, key),
            ));
        }
        root.push_path(&segments, Scalar::String(value));
    }
    Ok(root)
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_property(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => push_escaped(&mut key, &mut chars),
            '=' | ':' => break,
            c if c.is_whitespace() => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if chars.peek().is_some_and(|c| *c == '=' || *c == ':') {
                    chars.next();
                }
                break;
            }
            c => key.push(c),
        }
    }

    let rest: String = chars.collect();
    let mut value = String::new();
    let mut chars = rest.trim_start().chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            push_escaped(&mut value, &mut chars);
        } else {
            value.push(c);
        }
    }
    (key, value)
}

/// Decode the escape following a backslash. `\uXXXX` takes four hex digits;
/// a malformed one is kept as written.
fn push_escaped(out: &mut String, chars: &mut impl Iterator<Item = char>) {
    let Some(escaped) = chars.next() else {
        return;
    };
    match escaped {
        't' => out.push('\t'),
        'n' => out.push('\n'),
        'r' => out.push('\r'),
        'f' => out.push('\u{c}'),
        'u' => {
            let digits: String = chars.by_ref().take(4).collect();
            match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                Some(decoded) if digits.len() == 4 => out.push(decoded),
                _ => {
                    out.push('u');
                    out.push_str(&digits);
                }
            }
        }
        other => out.push(other),
    }
}

#[derive(Debug, Clone)]
enum SourceSpec {
    File(PathBuf),
    Tree { label: String, root: ConfigNode },
}

/// Ordered list of sources plus overrides.
///
/// Sources are added lowest priority first. Nothing is read until
/// [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    sources: Vec<SourceSpec>,
    overrides: Overrides,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(SourceSpec::File(path.into()));
        self
    }

    pub fn files<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths.into_iter().fold(self, |builder, path| builder.file(path))
    }

    /// Add an in-memory tree as the next source.
    pub fn tree(mut self, label: impl Into<String>, root: ConfigNode) -> Self {
        self.sources.push(SourceSpec::Tree {
            label: label.into(),
            root,
        });
        self
    }

    /// Replace the override set.
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> ConfigResult<Self> {
        self.overrides.insert(key, value)?;
        Ok(self)
    }

    /// Load every source in order and stack them under the overrides.
    ///
    /// The first source that fails aborts the build.
    pub fn build(&self) -> ConfigResult<CombinedConfig> {
        let mut loaded = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source {
                SourceSpec::File(path) => {
                    let root = load_source(path)?;
                    loaded.push((path.display().to_string(), root));
                }
                SourceSpec::Tree { label, root } => loaded.push((label.clone(), root.clone())),
            }
        }

        let combined = merge(loaded, &self.overrides);
        info!(
            sources = combined.len(),
            overrides = self.overrides.len(),
            "Configuration built"
        );
        Ok(combined)
    }
}
