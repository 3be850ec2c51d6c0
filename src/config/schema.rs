//! Static configuration schemas.
//!
//! A [`Schema`] is a named set of [`PropertyDescriptor`]s declared by the
//! code that consumes the configuration. Schemas are validated once, when
//! they are built, and shared behind an `Arc` afterwards.

use super::convert::ScalarType;
use super::path::PropertyPath;
use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Cardinality and shape of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Scalar,
    ScalarArray,
    Nested,
    NestedArray,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Scalar => write!(f, "scalar"),
            ValueKind::ScalarArray => write!(f, "scalar array"),
            ValueKind::Nested => write!(f, "nested"),
            ValueKind::NestedArray => write!(f, "nested array"),
        }
    }
}

/// Target schema of a nested property.
#[derive(Debug, Clone)]
pub enum SchemaRef {
    Schema(Arc<Schema>),
    /// The schema declaring the property, for tree-shaped configuration.
    Itself,
}

/// What a property resolves to.
#[derive(Debug, Clone)]
pub enum PropertyKind {
    Scalar(ScalarType),
    ScalarArray(ScalarType),
    Nested(SchemaRef),
    NestedArray(SchemaRef),
}

impl PropertyKind {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            PropertyKind::Scalar(_) => ValueKind::Scalar,
            PropertyKind::ScalarArray(_) => ValueKind::ScalarArray,
            PropertyKind::Nested(_) => ValueKind::Nested,
            PropertyKind::NestedArray(_) => ValueKind::NestedArray,
        }
    }
}

/// Declaration of one property.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    path: String,
    kind: PropertyKind,
    default: Option<String>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            default: None,
        }
    }

    /// Literal used when the path is absent. Only scalars accept one.
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn value_kind(&self) -> ValueKind {
        self.kind.value_kind()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_literal(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// A validated descriptor with its parsed path.
#[derive(Debug, Clone)]
pub(crate) struct Property {
    pub(crate) descriptor: PropertyDescriptor,
    pub(crate) path: PropertyPath,
}

/// A named, validated set of property descriptors.
#[derive(Debug)]
pub struct Schema {
    name: String,
    properties: Vec<Property>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            descriptors: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.entry(name).map(|p| &p.descriptor)
    }

    /// Descriptors in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().map(|p| &p.descriptor)
    }

    pub(crate) fn entry(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.descriptor.name == name)
    }
}

/// Collects descriptors and validates them in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    descriptors: Vec<PropertyDescriptor>,
}

impl SchemaBuilder {
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn scalar(self, name: &str, path: &str, ty: ScalarType) -> Self {
        self.property(PropertyDescriptor::new(name, path, PropertyKind::Scalar(ty)))
    }

    pub fn scalar_or(self, name: &str, path: &str, ty: ScalarType, default: &str) -> Self {
        self.property(
            PropertyDescriptor::new(name, path, PropertyKind::Scalar(ty)).with_default(default),
        )
    }

    pub fn scalar_array(self, name: &str, path: &str, ty: ScalarType) -> Self {
        self.property(PropertyDescriptor::new(name, path, PropertyKind::ScalarArray(ty)))
    }

    pub fn nested(self, name: &str, path: &str, schema: &Arc<Schema>) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            path,
            PropertyKind::Nested(SchemaRef::Schema(Arc::clone(schema))),
        ))
    }

    pub fn nested_array(self, name: &str, path: &str, schema: &Arc<Schema>) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            path,
            PropertyKind::NestedArray(SchemaRef::Schema(Arc::clone(schema))),
        ))
    }

    /// A child shaped like the schema being built.
    pub fn recursive(self, name: &str, path: &str) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            path,
            PropertyKind::Nested(SchemaRef::Itself),
        ))
    }

    /// A list of children shaped like the schema being built.
    pub fn recursive_array(self, name: &str, path: &str) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            path,
            PropertyKind::NestedArray(SchemaRef::Itself),
        ))
    }

    pub fn build(self) -> ConfigResult<Arc<Schema>> {
        let mut properties: Vec<Property> = Vec::with_capacity(self.descriptors.len());
        for descriptor in self.descriptors {
            let invalid =
                |reason: String| ConfigError::invalid_schema(&self.name, &descriptor.name, reason);

            if descriptor.name.is_empty() {
                return Err(invalid("has an empty name".into()));
            }
            if properties.iter().any(|p| p.descriptor.name == descriptor.name) {
                return Err(invalid("is declared twice".into()));
            }
            if descriptor.has_default() {
                match descriptor.value_kind() {
                    ValueKind::Scalar => {}
                    ValueKind::ScalarArray => {
                        return Err(invalid("is an array and cannot have a default value".into()));
                    }
                    ValueKind::Nested | ValueKind::NestedArray => {
                        return Err(invalid("is nested and cannot have a default value".into()));
                    }
                }
            }
            let path = PropertyPath::parse(&descriptor.path)
                .map_err(|e| invalid(format!("has an invalid path: {}", e)))?;

            properties.push(Property { descriptor, path });
        }
        Ok(Arc::new(Schema {
            name: self.name,
            properties,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn dependency() -> Arc<Schema> {
        Schema::builder("Dependency")
            .scalar("group_id", ".groupId", ScalarType::String)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_keeps_declaration_order() {
        let schema = Schema::builder("Example")
            .scalar_or("version", "version", ScalarType::String, "unknown")
            .scalar_array("authors", "authors", ScalarType::String)
            .nested_array("dependencies", "dependencies.dependency", &dependency())
            .build()
            .unwrap();

        let names: Vec<&str> = schema.properties().map(|p| p.name()).collect();
        assert_eq!(names, vec!["version", "authors", "dependencies"]);
        assert_eq!(schema.property("version").unwrap().default_literal(), Some("unknown"));
        assert_eq!(
            schema.property("dependencies").unwrap().value_kind(),
            ValueKind::NestedArray
        );
        assert!(schema.property("missing").is_none());
    }

    #[test]
    fn test_nested_default_is_rejected() {
        let err = Schema::builder("Example")
            .property(
                PropertyDescriptor::new(
                    "artifact",
                    "artifact_info",
                    PropertyKind::Nested(SchemaRef::Schema(dependency())),
                )
                .with_default("foo:bar:1.0"),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSchema);
        assert!(err.to_string().contains("artifact"));
    }

    #[test]
    fn test_array_default_is_rejected() {
        let err = Schema::builder("Example")
            .property(
                PropertyDescriptor::new(
                    "authors",
                    "authors",
                    PropertyKind::ScalarArray(ScalarType::String),
                )
                .with_default("Goofy"),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSchema);
    }

    #[test]
    fn test_duplicate_names_and_bad_paths_are_rejected() {
        let duplicate = Schema::builder("Example")
            .scalar("a", "a", ScalarType::String)
            .scalar("a", "b", ScalarType::String)
            .build();
        assert!(duplicate.is_err());

        let bad_path = Schema::builder("Example")
            .scalar("a", "a..b", ScalarType::String)
            .build();
        assert_eq!(bad_path.unwrap_err().code(), ErrorCode::InvalidSchema);
    }
}
